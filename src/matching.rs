//! Channel to EPG id matching
//!
//! A hand-maintained table maps directory display names to EPG channel ids.
//! [`auto_match`] proposes new rows by comparing names against an EPG feed;
//! its output is meant for review before being pasted into the table.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;

/// Known display name to EPG id pairs
pub const CHANNEL_MATCHES: &[(&str, &str)] = &[
    ("ABC News USA", "us-abcnews"),
    ("ABC USA", "us-abc"),
    ("AMC USA", "us-amc"),
    ("Animal Planet USA", "us-animalplanet"),
    ("BBC America USA", "us-bbcamerica"),
    ("BBC News UK", "uk-bbcnews"),
    ("BBC One UK", "uk-bbcone"),
    ("BBC Two UK", "uk-bbctwo"),
    ("beIN Sports 1 USA", "us-beinsports1"),
    ("beIN Sports 2 USA", "us-beinsports2"),
    ("beIN Sports 3 USA", "us-beinsports3"),
    ("beIN Sports USA", "us-beinsports"),
    ("BET USA", "us-bet"),
    ("Bloomberg USA", "us-bloomberg"),
    ("BT Sport 1 UK", "uk-btsport1"),
    ("BT Sport 2 UK", "uk-btsport2"),
    ("BT Sport 3 UK", "uk-btsport3"),
    ("BT Sport ESPN UK", "uk-btsportespen"),
    ("Cartoon Network USA", "us-cartoonnetwork"),
    ("CBS News USA", "us-cbsnews"),
    ("CBS Sports Network USA", "us-cbssportsnetwork"),
    ("CBS USA", "us-cbs"),
    ("CNBC USA", "CNBC.USA.us"),
    ("CNN USA", "us-cnn"),
    ("Comedy Central", "Comedy.Central.za"),
    ("Discovery Channel USA", "Discovery.Channel.tr"),
    ("Disney Channel USA", "Disney.Channel.za"),
    ("Disney Junior USA", "DISNEY.JR.uy"),
    ("Disney XD USA", "Disney.XD.pl"),
    ("E! USA", "us-eentertainment"),
    ("ESPN 2 USA", "us-espn2"),
    ("ESPN Deportes", "ESPN.Deportes.us"),
    ("ESPN USA", "us-espn"),
    ("Food Network USA", "us-foodnetwork"),
    ("FOX Business USA", "Fox.Business.us"),
    ("FOX News USA", "Fox.News.us"),
    ("FOX Sports 1 USA", "us-foxsports1"),
    ("FOX Sports 2 USA", "us-foxsports2"),
    ("FOX USA", "us-fox"),
    ("Fight Network", "plex.tv.Fight.Network.plex"),
    ("Golf Channel USA", "Golf.Channel.USA.us"),
    ("HBO USA", "us-hbo"),
    ("HGTV", "HGTV.uy"),
    ("History Channel USA", "us-history"),
    ("Investigation Discovery USA", "us-investigationdiscovery"),
    ("Lifetime USA", "us-lifetime"),
    ("MSNBC", "MSNBC.au"),
    ("MTV USA", "us-mtv"),
    ("Nat Geo Wild USA", "us-natgeowild"),
    ("National Geographic USA", "us-nationalgeographic"),
    ("NBC News USA", "us-nbcnews"),
    ("NBC Sports USA", "us-nbcsports"),
    ("NBC USA", "us-nbc"),
    ("NFL Network", "NFL.Network.us"),
    ("NHL Network USA", "NHL.Network.USA.us"),
    ("Nickelodeon USA", "us-nickelodeon"),
    ("PBS USA", "us-pbs"),
    ("SEC Network USA", "us-secnetwork"),
    ("Showtime USA", "us-showtime"),
    ("Sky News UK", "uk-skynews"),
    ("Sky Sports Football UK", "uk-skysportsfootball"),
    ("Sky Sports Main Event", "Sky.Sports.Main.Event.ie"),
    ("Sky Sports Premier League", "Sky.Sports.Premier.League.ie"),
    ("Starz USA", "us-starz"),
    ("Syfy USA", "us-syfy"),
    ("TBS USA", "us-tbs"),
    ("Tennis Channel USA", "us-tennischannel"),
    ("TLC", "TLC.tr"),
    ("TNT USA", "us-tnt"),
    ("Travel Channel", "Travel.Channel.za"),
    ("truTV USA", "us-trutv"),
    ("USA Network USA", "us-usanetwork"),
    ("VH1 USA", "us-vh1"),
    ("Weather Channel USA", "The.Weather.Channel.us"),
    ("YES Network USA", "us-yesnetwork"),
    ("WWE Network", "WWE.Network.us"),
    ("DAZN LaLiga", "DAZN.LALIGA.es"),
    ("DAZN LaLiga 2", "DAZN.LALIGA.2.es"),
    ("TSN1", "TSN1.mt"),
    ("TSN2", "TSN2.mt"),
    ("TSN3", "TSN3.mt"),
    ("TSN4", "TSN4.mt"),
    ("TSN5", "TSN5.mt"),
    ("Sportsnet One", "Sportsnet.One.ca"),
    ("Sportsnet 360", "Sportsnet.360.ca"),
    ("Sportsnet World", "Sportsnet.World.ca"),
    ("TVA Sports", "TVA.Sports.ca"),
    ("TVA Sports 2", "TVA.Sports.2.ca"),
    ("Telemundo", "TELEMUNDO.uy"),
    ("Destination America", "Destination.America.us"),
    ("Prima Sport 1", "Prima.Sport.1.ro"),
    ("Prima Sport 2", "Prima.Sport.2.ro"),
    ("Prima Sport 3", "Prima.Sport.3.ro"),
    ("Prima Sport 4", "Prima.Sport.4.ro"),
    ("Animal Planet", "ANIMAL.PLANET.uy"),
    ("Astro Cricket", "Astro.Cricket.my"),
    ("Boomerang", "Boomerang.vn"),
    ("Cleo TV", "CLEO.TV.us"),
    ("Fox Cricket", "FoxCricket.alt.au"),
    ("Nick Music", "Nick.Music.nz"),
    ("Nicktoons", "NickTOONS.za"),
    ("Oxygen True Crime", "Oxygen.True.Crime.ca"),
    ("Smithsonian Channel", "Smithsonian.Channel.my"),
    ("Sky Sport Bundesliga 1 HD", "Sky.Sport.Bundesliga.1.HD.at"),
    ("Sky Sport Austria 1 HD", "Sky.Sport.Austria.1.HD.de"),
    ("Sky Crime", "Sky.Crime.it"),
    ("Sky History", "Sky.History.ie"),
    ("Sky Witness HD", "Sky.Witness.HD.uk"),
    ("Sky Atlantic", "Sky.Atlantic.it"),
    ("SportDigital Fussball", "SPORTDIGITAL.FUSSBALL.ch"),
    ("Fashion TV", "Fashion.TV.tr"),
    ("Dave", "Dave.ch"),
    ("5 USA", "5.USA.uk"),
    ("V Film Premiere", "V.Film.Premiere.se"),
    ("V Film Family", "V.Film.Family.se"),
    ("TeenNick", "TeenNick.ro"),
    ("TV2 Zulu", "TV2.Zulu.se"),
    ("TVP INFO", "TVP.Info.pl"),
    ("Sundance TV", "Sundance.TV.pl"),
    ("Paramount Network", "Paramount.Network.se"),
    ("Marquee Sports Network", "Marquee.Sports.Network.us"),
    ("Motor Trend", "Motor.Trend.it"),
    ("GOLF Channel USA", "Golf.Channel.USA.us"),
    ("Discovery Life Channel", "Discovery.Life.Channel.us"),
    ("FOX Soccer Plus", "FOX.Soccer.Plus.us"),
    ("Willow XTRA", "Willow.Xtra.us"),
];

/// EPG id for a directory display name. Exact match only.
pub fn epg_id_for(name: &str) -> Option<&'static str> {
    CHANNEL_MATCHES
        .iter()
        .find(|(display, _)| *display == name)
        .map(|(_, id)| *id)
}

/// Outcome of matching a list of names against an EPG feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    /// `(name, epg id)` in input order
    pub matches: Vec<(String, String)>,
    pub unmatched: Vec<String>,
}

impl MatchReport {
    /// Matches as table rows ready to paste into [`CHANNEL_MATCHES`]
    pub fn to_table_source(&self) -> String {
        let mut out = String::from("pub const CHANNEL_MATCHES: &[(&str, &str)] = &[\n");
        for (name, id) in &self.matches {
            let _ = writeln!(out, "    ({:?}, {:?}),", name, id);
        }
        out.push_str("];\n");
        out
    }
}

/// Match names against an index of lowercase EPG display name to id.
///
/// The key is the trimmed, lowercased name; only exact equality counts.
/// Names keep their original spelling in the report.
pub fn auto_match<S: AsRef<str>>(names: &[S], epg_index: &HashMap<String, String>) -> MatchReport {
    let mut report = MatchReport::default();
    for name in names {
        let name = name.as_ref();
        match epg_index.get(&name.trim().to_lowercase()) {
            Some(id) => report.matches.push((name.to_string(), id.clone())),
            None => report.unmatched.push(name.to_string()),
        }
    }
    report
}

/// One name per non-blank line, trimmed
pub fn parse_name_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> HashMap<String, String> {
        HashMap::from([
            ("espn usa".to_string(), "us-espn".to_string()),
            ("sky sports main event".to_string(), "Sky.Sports.Main.Event.ie".to_string()),
        ])
    }

    #[test]
    fn test_static_table_lookup() {
        assert_eq!(epg_id_for("ESPN USA"), Some("us-espn"));
        assert_eq!(epg_id_for("CNBC USA"), Some("CNBC.USA.us"));
        assert_eq!(epg_id_for("Obscure Regional Channel"), None);
        assert_eq!(epg_id_for("espn usa"), None);
    }

    #[test]
    fn test_table_names_are_unique() {
        let mut names: Vec<_> = CHANNEL_MATCHES.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CHANNEL_MATCHES.len());
    }

    #[test]
    fn test_auto_match() {
        let names = ["ESPN USA", "  Sky Sports Main Event ", "Obscure Regional Channel"];
        let report = auto_match(&names, &index());

        assert_eq!(
            report.matches,
            vec![
                ("ESPN USA".to_string(), "us-espn".to_string()),
                ("  Sky Sports Main Event ".to_string(), "Sky.Sports.Main.Event.ie".to_string()),
            ]
        );
        assert_eq!(report.unmatched, vec!["Obscure Regional Channel"]);
    }

    #[test]
    fn test_table_source_rendering() {
        let report = auto_match(&["ESPN USA"], &index());
        let source = report.to_table_source();
        assert!(source.starts_with("pub const CHANNEL_MATCHES"));
        assert!(source.contains("    (\"ESPN USA\", \"us-espn\"),\n"));
        assert!(source.ends_with("];\n"));
    }

    #[test]
    fn test_parse_name_list() {
        assert_eq!(parse_name_list("ABC USA\n\n  ESPN USA \n"), vec!["ABC USA", "ESPN USA"]);
    }
}
