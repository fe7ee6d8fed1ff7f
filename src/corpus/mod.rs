//! Corpus index module
//!
//! The corpus is the read-only side of the engine: verse text keyed by
//! canonical address, chapter/verse bounds, and the book alias table used by
//! the reference parser and by autocomplete.
//!
//! - `BookId`: closed enumeration of the canon with display names and codes
//! - `AliasTable`: normalized, case-insensitive alias keys
//! - `CorpusIndex`: immutable lookup built once per translation

mod alias;
mod book;
mod index;

pub use alias::{alias_key, AliasKind, AliasTable, BookResolution};
pub use book::BookId;
pub use index::{CorpusEntry, CorpusError, CorpusFile, CorpusIndex};

#[cfg(test)]
pub(crate) fn test_corpus() -> CorpusIndex {
    use BookId::*;

    let verses: &[(BookId, u32, u32, &str)] = &[
        (Genesis, 1, 1, "In the beginning God created the heaven and the earth."),
        (Genesis, 1, 2, "And the earth was without form, and void; and darkness was upon the face of the deep. And the Spirit of God moved upon the face of the waters."),
        (Genesis, 1, 3, "And God said, Let there be light: and there was light."),
        (Psalms, 23, 1, "The LORD is my shepherd; I shall not want."),
        (Psalms, 23, 2, "He maketh me to lie down in green pastures: he leadeth me beside the still waters."),
        (Psalms, 23, 3, "He restoreth my soul: he leadeth me in the paths of righteousness for his name's sake."),
        (Psalms, 23, 4, "Yea, though I walk through the valley of the shadow of death, I will fear no evil: for thou art with me; thy rod and thy staff they comfort me."),
        (Psalms, 23, 5, "Thou preparest a table before me in the presence of mine enemies: thou anointest my head with oil; my cup runneth over."),
        (Psalms, 23, 6, "Surely goodness and mercy shall follow me all the days of my life: and I will dwell in the house of the LORD for ever."),
        (John, 1, 1, "In the beginning was the Word, and the Word was with God, and the Word was God."),
        (John, 3, 16, "For God so loved the world, that he gave his only begotten Son, that whosoever believeth in him should not perish, but have everlasting life."),
        (John, 3, 17, "For God sent not his Son into the world to condemn the world; but that the world through him might be saved."),
        (John, 3, 18, "He that believeth on him is not condemned: but he that believeth not is condemned already, because he hath not believed in the name of the only begotten Son of God."),
        (John, 3, 19, "And this is the condemnation, that light is come into the world, and men loved darkness rather than light, because their deeds were evil."),
        (John, 3, 20, "For every one that doeth evil hateth the light, neither cometh to the light, lest his deeds should be reproved."),
        (John, 4, 1, "When therefore the Lord knew how the Pharisees had heard that Jesus made and baptized more disciples than John,"),
        (John, 4, 2, "(Though Jesus himself baptized not, but his disciples,)"),
        (Romans, 5, 8, "But God commendeth his love toward us, in that, while we were yet sinners, Christ died for us."),
        (Philemon, 1, 1, "Paul, a prisoner of Jesus Christ, and Timothy our brother, unto Philemon our dearly beloved, and fellowlabourer,"),
        (Hebrews, 11, 1, "Now faith is the substance of things hoped for, the evidence of things not seen."),
        (Hebrews, 11, 2, "For by it the elders obtained a good report."),
        (Hebrews, 11, 3, "Through faith we understand that the worlds were framed by the word of God, so that things which are seen were not made of things which do appear."),
        (FirstJohn, 1, 9, "If we confess our sins, he is faithful and just to forgive us our sins, and to cleanse us from all unrighteousness."),
        (Jude, 1, 1, "Jude, the servant of Jesus Christ, and brother of James, to them that are sanctified by God the Father, and preserved in Jesus Christ, and called:"),
        (Jude, 1, 2, "Mercy unto you, and peace, and love, be multiplied."),
        (Jude, 1, 3, "Beloved, when I gave all diligence to write unto you of the common salvation, it was needful for me to write unto you, and exhort you that ye should earnestly contend for the faith which was once delivered unto the saints."),
    ];

    CorpusIndex::from_entries(
        "KJV",
        verses
            .iter()
            .map(|(book, chapter, verse, text)| CorpusEntry::new(*book, *chapter, *verse, text)),
    )
    .expect("test corpus is valid")
}
