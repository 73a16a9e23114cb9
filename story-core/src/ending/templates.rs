//! Ending titles and descriptions, two per genre and category.

use super::EndingCategory;
use crate::story::Genre;
use std::collections::HashMap;

/// A candidate title/description pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndingTemplate {
    pub title: &'static str,
    pub description: &'static str,
}

const fn t(title: &'static str, description: &'static str) -> EndingTemplate {
    EndingTemplate { title, description }
}

lazy_static::lazy_static! {
    /// Template table keyed by genre and category.
    static ref TEMPLATES: HashMap<(Genre, EndingCategory), Vec<EndingTemplate>> = {
        use EndingCategory::*;
        use Genre::*;
        let mut m = HashMap::new();

        m.insert((Fantasy, Heroic), vec![
            t("Champion of the Realm", "You stood against the darkness and the realm endures because of it."),
            t("The Oathkeeper", "Every promise you made was kept, and the kingdom sings your name."),
        ]);
        m.insert((Fantasy, Triumphant), vec![
            t("Crown of Many Banners", "Allies from every corner rallied to you, and together you reshaped the realm."),
            t("The High Sovereign", "Your leadership united the scattered houses under one bright banner."),
        ]);
        m.insert((Fantasy, Tragic), vec![
            t("Ashes of the Kingdom", "The realm fell despite your efforts, and only songs of sorrow remain."),
            t("The Last Light Fades", "Your flame burned bright, but the darkness proved stronger."),
        ]);
        m.insert((Fantasy, Mysterious), vec![
            t("Beyond the Veil", "You stepped through a door no map records, and the realm still wonders where you went."),
            t("The Unwritten Rune", "The prophecy closed on a symbol no scholar can read."),
        ]);
        m.insert((Fantasy, Bittersweet), vec![
            t("A Quiet Homecoming", "Peace returned, though not everyone came home to see it."),
            t("The Price of Dawn", "The sun rises on a saved realm, paid for with what you lost."),
        ]);

        m.insert((Scifi, Heroic), vec![
            t("Guardian of the Stars", "The colony lives because you refused to abandon it."),
            t("Signal in the Void", "Your broadcast reached home, and help is finally on its way."),
        ]);
        m.insert((Scifi, Triumphant), vec![
            t("Admiral of the Free Fleet", "You forged a fleet from rivals and led it to a new horizon."),
            t("The New Accord", "Every faction signed, and the galaxy remembers who brought them together."),
        ]);
        m.insert((Scifi, Tragic), vec![
            t("Silence Between Stars", "The station went dark, and no one answered the final hail."),
            t("Entropy Wins", "The reactor failed, and the last log entry is yours."),
        ]);
        m.insert((Scifi, Mysterious), vec![
            t("The Anomaly Remains", "The signal stopped the moment you understood it."),
            t("Ghost in the Array", "Something followed you home from the edge of known space."),
        ]);
        m.insert((Scifi, Bittersweet), vec![
            t("Light-Years from Home", "You saved the crew, but home is now a lifetime away."),
            t("The Long Orbit", "The mission succeeded, and the cost is written in the empty bunks."),
        ]);

        m.insert((Mystery, Heroic), vec![
            t("Case Closed", "The culprit is behind bars and the city sleeps a little easier."),
            t("The Sharpest Eye", "You saw what everyone missed and justice followed."),
        ]);
        m.insert((Mystery, Triumphant), vec![
            t("Master of Deduction", "With trusted allies at your side, you unraveled the whole conspiracy."),
            t("The Grand Reveal", "Every suspect gathered, every thread pulled, and the truth laid bare."),
        ]);
        m.insert((Mystery, Tragic), vec![
            t("Too Late to Save", "You solved the case a moment after it mattered."),
            t("The Cold File", "The killer walked free and the file gathers dust."),
        ]);
        m.insert((Mystery, Mysterious), vec![
            t("The Unsolved Riddle", "Some answers were found, but the deepest question remains."),
            t("A Name Never Spoken", "The final clue points to someone who does not exist."),
        ]);
        m.insert((Mystery, Bittersweet), vec![
            t("Justice, Half Served", "The truth came out, though it cost a friendship."),
            t("The Honest Lie", "You kept one secret so others could heal."),
        ]);

        m.insert((Horror, Heroic), vec![
            t("Survivor", "You walked out at dawn, and the thing in the dark did not follow."),
            t("The Ward Holds", "The seal you placed will keep it sleeping for another century."),
        ]);
        m.insert((Horror, Triumphant), vec![
            t("Those Who Stood Together", "Your band of survivors faced the horror as one and drove it back."),
            t("Lantern Bearer", "You led the others through the night and every one of them saw morning."),
        ]);
        m.insert((Horror, Tragic), vec![
            t("Consumed", "The house keeps its guests, and now it keeps you."),
            t("No Morning Comes", "The candles guttered out one by one."),
        ]);
        m.insert((Horror, Mysterious), vec![
            t("It Still Watches", "You escaped, but the whispers followed you home."),
            t("The Empty Room", "When the lights came back, the others were simply gone."),
        ]);
        m.insert((Horror, Bittersweet), vec![
            t("Scarred but Breathing", "You survived, and you will never sleep in the dark again."),
            t("The Last Survivor", "You made it out alone, carrying the names of those who did not."),
        ]);

        m.insert((Romance, Heroic), vec![
            t("Love Conquers", "You fought for each other and won a future together."),
            t("Hearts Aligned", "Every obstacle fell before a love this stubborn."),
        ]);
        m.insert((Romance, Triumphant), vec![
            t("The Celebrated Union", "Friends and family gathered to cheer the love you built."),
            t("A Life Well Chosen", "You chose with courage, and everyone you love is beside you."),
        ]);
        m.insert((Romance, Tragic), vec![
            t("Letters Never Sent", "Love was real, but the timing never was."),
            t("Parting Shores", "You watched the ship leave and did not call out."),
        ]);
        m.insert((Romance, Mysterious), vec![
            t("The Stranger's Smile", "They left without a word, but the door stays unlocked."),
            t("Unfinished Song", "Some melodies end on a note that asks to be continued."),
        ]);
        m.insert((Romance, Bittersweet), vec![
            t("Fond Farewell", "You let each other go, and both of you are better for it."),
            t("Someday, Perhaps", "Not now, not yet, but the door is not closed."),
        ]);

        m
    };
}

/// The candidate templates for a genre and category.
pub fn templates_for(genre: Genre, category: EndingCategory) -> &'static [EndingTemplate] {
    TEMPLATES
        .get(&(genre, category))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
