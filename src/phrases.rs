//! Fixed utterances warmed at startup, most urgent first.

use crate::speech::SpeechDispatcher;

/// Feedback lines every game uses.
const FEEDBACK: [&str; 2] = ["Aferin!", "Tekrar dene bakalım."];

/// First-level prompts of each game.
const FIRST_LEVEL_PROMPTS: [&str; 6] = [
    "Bana kareyi bulabilir misin?",
    "Sıradaki şekil hangisi olmalı?",
    "Bu resimlere iyi bak.",
    "Bu resmin gölgesi hangisi? Dikkatli bak.",
    "Hangi parça eksik?",
    "Yağmur yağınca şemsiye açarız. Peki güneş çıkınca ne takarız?",
];

/// Later levels, loaded in the background.
const LATER_PROMPTS: [&str; 3] = [
    "Az önce hangi resmi görmüştün?",
    "Ayağımıza ayakkabı giyeriz. Peki elimize ne takarız?",
    "Maymun muz sever. Peki tavşan ne sever?",
];

/// Shape names in accusative ("find me the ...") form.
const SHAPES_ACCUSATIVE: [&str; 5] = ["daireyi", "kareyi", "üçgeni", "yıldızı", "kalbi"];
const SHAPES: [&str; 5] = ["daire", "kare", "üçgen", "yıldız", "kalp"];
const COLORS: [&str; 6] = ["kırmızı", "mavi", "yeşil", "sarı", "mor", "turuncu"];

/// Every startup phrase in priority order, without duplicates.
pub fn startup_phrases() -> Vec<String> {
    let mut phrases: Vec<String> = FEEDBACK
        .iter()
        .chain(FIRST_LEVEL_PROMPTS.iter())
        .chain(LATER_PROMPTS.iter())
        .map(|s| s.to_string())
        .collect();

    phrases.extend(
        SHAPES_ACCUSATIVE
            .iter()
            .map(|shape| format!("Bana {} bulabilir misin?", shape)),
    );
    phrases.extend(
        COLORS
            .iter()
            .map(|color| format!("Bana {} renkli olanı bulabilir misin?", color)),
    );
    for color in COLORS {
        for shape in SHAPES {
            phrases.push(format!("Bana {} {} şeklini bulabilir misin?", color, shape));
        }
    }

    // "Bana kareyi bulabilir misin?" 同时出现在第一关和形状列表里
    let mut seen = std::collections::HashSet::new();
    phrases.retain(|p| seen.insert(p.clone()));
    phrases
}

/// Spoken when a game ends.
pub fn completion_phrase(stars: u32) -> String {
    format!("Tebrikler! {} yıldız kazandın!", stars)
}

/// Queue the whole startup set for background synthesis.
pub fn preload_startup_phrases(dispatcher: &SpeechDispatcher) -> usize {
    let phrases = startup_phrases();
    for phrase in &phrases {
        dispatcher.preload(phrase);
    }
    log::info!("Queued {} startup phrases for preloading", phrases.len());
    phrases.len()
}
