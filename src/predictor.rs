use rand::Rng;

use crate::models::predictions::{
    MatchPrediction, MatchPredictionRequest, WicketPrediction, WicketPredictionRequest,
};
use crate::models::teams;

const RUN_WEIGHT: f64 = 0.6;
const WICKET_BONUS: f64 = 5.0;
const HOME_BONUS: f64 = 10.0;

/// Heuristic winner call from user-entered scores: weighted runs, a bonus
/// for wickets in hand, weather offsets, and a home-ground bonus when the
/// venue contains the team's home city.
pub fn predict_match(request: &MatchPredictionRequest) -> MatchPrediction {
    let mut team1_score = request.runs_team1 as f64 * RUN_WEIGHT;
    let mut team2_score = request.runs_team2 as f64 * RUN_WEIGHT;

    team1_score += (10 - request.wickets_team1) as f64 * WICKET_BONUS;
    team2_score += (10 - request.wickets_team2) as f64 * WICKET_BONUS;

    let weather_offset = match request.weather.to_lowercase().as_str() {
        "rainy" => -5.0,
        "hot" => 3.0,
        "sunny" => 2.0,
        _ => 0.0,
    };
    team1_score += weather_offset;
    team2_score += weather_offset;

    let team1_norm = teams::normalize_name(&request.team1);
    let team2_norm = teams::normalize_name(&request.team2);

    if let Some(city) = teams::home_city(&team1_norm) {
        if request.venue.contains(city) {
            team1_score += HOME_BONUS;
        }
    }
    if let Some(city) = teams::home_city(&team2_norm) {
        if request.venue.contains(city) {
            team2_score += HOME_BONUS;
        }
    }

    let winner = if team1_score > team2_score {
        request.team1.clone()
    } else {
        request.team2.clone()
    };

    let total = team1_score + team2_score;
    let winning_probability = if total > 0.0 {
        team1_score.max(team2_score) / total * 100.0
    } else {
        50.0
    };

    let score_diff = (team1_score - team2_score).abs();
    let confidence = if score_diff > 15.0 {
        "High"
    } else if score_diff > 8.0 {
        "Medium"
    } else {
        "Low"
    };

    MatchPrediction {
        team1: request.team1.clone(),
        team2: request.team2.clone(),
        predicted_winner: winner,
        team1_score: round2(team1_score),
        team2_score: round2(team2_score),
        winning_probability: round2(winning_probability),
        confidence: confidence.to_string(),
    }
}

/// Wicket and boundary outlook. The wicket estimate is capped by the overs
/// played; boundary, six, and extras counts are drawn from fixed ranges.
pub fn predict_wickets(request: &WicketPredictionRequest) -> WicketPrediction {
    let combined = request.wickets_team1 + request.wickets_team2;
    let cap = if request.overs <= 6 {
        4
    } else if request.overs <= 12 {
        6
    } else {
        10
    };

    let mut rng = rand::thread_rng();
    WicketPrediction {
        team1: request.team1.clone(),
        team2: request.team2.clone(),
        overs: request.overs,
        predicted_wickets: combined.min(cap),
        predicted_boundaries: rng.gen_range(8..=15),
        predicted_sixes: rng.gen_range(2..=8),
        predicted_extras: rng.gen_range(2..=8),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(runs1: i64, runs2: i64, venue: &str, weather: &str) -> MatchPredictionRequest {
        MatchPredictionRequest {
            team1: "CSK".to_string(),
            team2: "MI".to_string(),
            venue: venue.to_string(),
            weather: weather.to_string(),
            runs_team1: runs1,
            runs_team2: runs2,
            wickets_team1: 3,
            wickets_team2: 3,
            username: None,
        }
    }

    #[test]
    fn higher_score_wins_on_neutral_ground() {
        let prediction = predict_match(&request(180, 150, "Neutral", "Sunny"));
        assert_eq!(prediction.predicted_winner, "CSK");
        assert!(prediction.team1_score > prediction.team2_score);
        assert!(prediction.winning_probability > 50.0);
        assert!(prediction.winning_probability <= 100.0);
    }

    #[test]
    fn home_ground_bonus_can_flip_a_tight_match() {
        // 10 run deficit becomes a 6-point run deficit; the +10 home bonus
        // flips it at the Wankhede.
        let prediction = predict_match(&request(150, 160, "Wankhede Stadium, Mumbai", "Sunny"));
        assert_eq!(prediction.predicted_winner, "MI");

        let away = predict_match(&request(160, 150, "Wankhede Stadium, Mumbai", "Sunny"));
        assert_eq!(away.predicted_winner, "MI");
    }

    #[test]
    fn weather_shifts_both_sides_equally() {
        let sunny = predict_match(&request(170, 140, "Neutral", "Sunny"));
        let rainy = predict_match(&request(170, 140, "Neutral", "Rainy"));
        assert_eq!(sunny.predicted_winner, rainy.predicted_winner);
        assert!((sunny.team1_score - rainy.team1_score - 7.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_bands_follow_the_score_gap() {
        assert_eq!(
            predict_match(&request(200, 120, "Neutral", "Sunny")).confidence,
            "High"
        );
        assert_eq!(
            predict_match(&request(150, 170, "Neutral", "Sunny")).confidence,
            "Medium"
        );
        assert_eq!(
            predict_match(&request(150, 155, "Neutral", "Sunny")).confidence,
            "Low"
        );
    }

    #[test]
    fn wicket_estimate_respects_the_overs_cap() {
        let short_game = WicketPredictionRequest {
            team1: "RR".to_string(),
            team2: "GT".to_string(),
            overs: 5,
            wickets_team1: 5,
            wickets_team2: 5,
        };
        let prediction = predict_wickets(&short_game);
        assert_eq!(prediction.predicted_wickets, 4);
        assert!((8..=15).contains(&prediction.predicted_boundaries));
        assert!((2..=8).contains(&prediction.predicted_sixes));
        assert!((2..=8).contains(&prediction.predicted_extras));

        let full_game = WicketPredictionRequest {
            overs: 20,
            ..short_game
        };
        assert_eq!(predict_wickets(&full_game).predicted_wickets, 10);
    }
}
