use serde::Serialize;

/// Static franchise reference data for the current season.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: &'static str,
    pub full_name: &'static str,
    pub captain: &'static str,
    pub coach: &'static str,
    pub titles: u32,
    pub home: &'static str,
    pub top_scorer: &'static str,
    pub top_bowler: &'static str,
    pub founded: u32,
}

pub const SEASON: u32 = 2025;

pub const TEAMS: [Team; 10] = [
    Team {
        name: "CSK",
        full_name: "CHENNAI SUPER KINGS",
        captain: "Ruturaj Gaikwad",
        coach: "Stephen Fleming",
        titles: 5,
        home: "Chennai",
        top_scorer: "Ruturaj Gaikwad",
        top_bowler: "Matheesha Pathirana",
        founded: 2008,
    },
    Team {
        name: "MI",
        full_name: "MUMBAI INDIANS",
        captain: "Hardik Pandya",
        coach: "Mark Boucher",
        titles: 5,
        home: "Mumbai",
        top_scorer: "Suryakumar Yadav",
        top_bowler: "Jasprit Bumrah",
        founded: 2008,
    },
    Team {
        name: "RCB",
        full_name: "ROYAL CHALLENGERS BANGALORE",
        captain: "Faf du Plessis",
        coach: "Andy Flower",
        titles: 1,
        home: "Bangalore",
        top_scorer: "Virat Kohli",
        top_bowler: "Mohammed Siraj",
        founded: 2008,
    },
    Team {
        name: "KKR",
        full_name: "KOLKATA KNIGHT RIDERS",
        captain: "Shreyas Iyer",
        coach: "Chandrakant Pandit",
        titles: 3,
        home: "Kolkata",
        top_scorer: "Sunil Narine",
        top_bowler: "Varun Chakravarthy",
        founded: 2008,
    },
    Team {
        name: "PBKS",
        full_name: "PUNJAB KINGS",
        captain: "Shikhar Dhawan",
        coach: "Trevor Bayliss",
        titles: 0,
        home: "Mohali",
        top_scorer: "Shikhar Dhawan",
        top_bowler: "Arshdeep Singh",
        founded: 2008,
    },
    Team {
        name: "RR",
        full_name: "RAJASTHAN ROYALS",
        captain: "Sanju Samson",
        coach: "Kumar Sangakkara",
        titles: 1,
        home: "Jaipur",
        top_scorer: "Yashasvi Jaiswal",
        top_bowler: "Trent Boult",
        founded: 2008,
    },
    Team {
        name: "GT",
        full_name: "GUJARAT TITANS",
        captain: "Shubman Gill",
        coach: "Ashish Nehra",
        titles: 1,
        home: "Ahmedabad",
        top_scorer: "Shubman Gill",
        top_bowler: "Mohit Sharma",
        founded: 2022,
    },
    Team {
        name: "LSG",
        full_name: "LUCKNOW SUPER GIANTS",
        captain: "KL Rahul",
        coach: "Justin Langer",
        titles: 0,
        home: "Lucknow",
        top_scorer: "KL Rahul",
        top_bowler: "Naveen-ul-Haq",
        founded: 2022,
    },
    Team {
        name: "DC",
        full_name: "DELHI CAPITALS",
        captain: "Rishabh Pant",
        coach: "Ricky Ponting",
        titles: 0,
        home: "Delhi",
        top_scorer: "Rishabh Pant",
        top_bowler: "Kuldeep Yadav",
        founded: 2008,
    },
    Team {
        name: "SRH",
        full_name: "SUNRISERS HYDERABAD",
        captain: "Pat Cummins",
        coach: "Daniel Vettori",
        titles: 1,
        home: "Hyderabad",
        top_scorer: "Abhishek Sharma",
        top_bowler: "T Natarajan",
        founded: 2013,
    },
];

pub const VENUES: [&str; 10] = [
    "M. A. Chidambaram Stadium, Chennai",
    "Wankhede Stadium, Mumbai",
    "M. Chinnaswamy Stadium, Bangalore",
    "Eden Gardens, Kolkata",
    "Punjab Cricket Association Stadium, Mohali",
    "Rajasthan Cricket Association Stadium, Jaipur",
    "Narendra Modi Stadium, Ahmedabad",
    "BRSABVE Cricket Ground, Lucknow",
    "Arun Jaitley Stadium, Delhi",
    "Rajiv Gandhi International Cricket Stadium, Hyderabad",
];

/// Accepted aliases beyond the canonical codes and full names, including
/// renamed and defunct franchises.
const ALIASES: [(&str, &str); 5] = [
    ("ROYAL CHALLENGERS BENGALURU", "ROYAL CHALLENGERS BANGALORE"),
    ("DD", "DELHI CAPITALS"),
    ("DELHI DAREDEVILS", "DELHI CAPITALS"),
    ("KXIP", "PUNJAB KINGS"),
    ("KINGS XI PUNJAB", "PUNJAB KINGS"),
];

/// Normalize arbitrary user input ("csk", "The Delhi Daredevils") to a
/// canonical full team name. Unrecognized names pass through uppercased.
pub fn normalize_name(name: &str) -> String {
    let mut key = name.trim().to_uppercase();
    if let Some(stripped) = key.strip_prefix("THE ") {
        key = stripped.to_string();
    }

    for team in &TEAMS {
        if key == team.name || key == team.full_name {
            return team.full_name.to_string();
        }
    }
    for (alias, full) in &ALIASES {
        if key == *alias {
            return full.to_string();
        }
    }

    key
}

pub fn by_code(code: &str) -> Option<&'static Team> {
    TEAMS.iter().find(|t| t.name == code)
}

/// Short code for a canonical full name, if it maps to a known franchise.
pub fn short_name(full_name: &str) -> Option<&'static str> {
    TEAMS
        .iter()
        .find(|t| t.full_name == full_name)
        .map(|t| t.name)
}

/// Home city for a canonical full name, used for the home-ground bonus.
pub fn home_city(full_name: &str) -> Option<&'static str> {
    TEAMS
        .iter()
        .find(|t| t.full_name == full_name)
        .map(|t| t.home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_full_names_normalize() {
        assert_eq!(normalize_name("csk"), "CHENNAI SUPER KINGS");
        assert_eq!(normalize_name("Mumbai Indians"), "MUMBAI INDIANS");
        assert_eq!(normalize_name("the rajasthan royals"), "RAJASTHAN ROYALS");
    }

    #[test]
    fn defunct_franchises_map_to_successors() {
        assert_eq!(normalize_name("DD"), "DELHI CAPITALS");
        assert_eq!(normalize_name("Kings XI Punjab"), "PUNJAB KINGS");
        assert_eq!(
            normalize_name("Royal Challengers Bengaluru"),
            "ROYAL CHALLENGERS BANGALORE"
        );
    }

    #[test]
    fn unknown_names_pass_through_uppercased() {
        assert_eq!(normalize_name("village eleven"), "VILLAGE ELEVEN");
    }

    #[test]
    fn short_and_home_lookups_agree_with_the_catalog() {
        assert_eq!(short_name("CHENNAI SUPER KINGS"), Some("CSK"));
        assert_eq!(home_city("GUJARAT TITANS"), Some("Ahmedabad"));
        assert!(short_name("VILLAGE ELEVEN").is_none());
    }
}
