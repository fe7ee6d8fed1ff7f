//! Shared fixtures for integration tests

use std::sync::Arc;

use verse_engine::corpus::{BookId, CorpusEntry, CorpusIndex};
use verse_engine::{Session, SessionConfig};

const VERSES: &[(BookId, u32, u32, &str)] = &[
    (BookId::Genesis, 1, 1, "In the beginning God created the heaven and the earth."),
    (BookId::Genesis, 1, 2, "And the earth was without form, and void; and darkness was upon the face of the deep."),
    (BookId::Psalms, 23, 1, "The LORD is my shepherd; I shall not want."),
    (BookId::Psalms, 23, 2, "He maketh me to lie down in green pastures: he leadeth me beside the still waters."),
    (BookId::Psalms, 23, 3, "He restoreth my soul: he leadeth me in the paths of righteousness for his name's sake."),
    (BookId::John, 3, 16, "For God so loved the world, that he gave his only begotten Son, that whosoever believeth in him should not perish, but have everlasting life."),
    (BookId::John, 3, 17, "For God sent not his Son into the world to condemn the world; but that the world through him might be saved."),
    (BookId::John, 3, 18, "He that believeth on him is not condemned: but he that believeth not is condemned already."),
    (BookId::John, 3, 19, "And this is the condemnation, that light is come into the world, and men loved darkness rather than light."),
    (BookId::John, 3, 20, "For every one that doeth evil hateth the light, neither cometh to the light."),
    (BookId::John, 4, 2, "(Though Jesus himself baptized not, but his disciples,)"),
    (BookId::Romans, 5, 8, "But God commendeth his love toward us, in that, while we were yet sinners, Christ died for us."),
    (BookId::Hebrews, 11, 1, "Now faith is the substance of things hoped for, the evidence of things not seen."),
    (BookId::Hebrews, 11, 2, "For by it the elders obtained a good report."),
    (BookId::FirstJohn, 1, 9, "If we confess our sins, he is faithful and just to forgive us our sins."),
    (BookId::Jude, 1, 1, "Jude, the servant of Jesus Christ, and brother of James, to them that are sanctified by God the Father."),
    (BookId::Jude, 1, 2, "Mercy unto you, and peace, and love, be multiplied."),
    (BookId::Jude, 1, 3, "Beloved, when I gave all diligence to write unto you of the common salvation."),
];

pub fn corpus() -> Arc<CorpusIndex> {
    let entries = VERSES
        .iter()
        .map(|(book, chapter, verse, text)| CorpusEntry::new(*book, *chapter, *verse, text));
    Arc::new(CorpusIndex::from_entries("KJV", entries).unwrap())
}

pub fn session() -> Session {
    Session::new(corpus(), SessionConfig::default()).unwrap()
}
