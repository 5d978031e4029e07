//! Behavioral type classification.
//!
//! Each player's mean stars per value are fitted with the linear model
//!
//! ```text
//! y = u0 + 5 · u1 · x / 99
//! ```
//!
//! where `x` is a cell value in `[0, 99]` and `y` the mean stars the player
//! gave to it. The slope `u1` is the mean-stars change over the whole value
//! range, scaled to the 0–5 star range: an honest player rates high values with
//! many stars (positive slope) while a misleading one does the opposite.
//!
//! The slope is then compared to two [`ClassificationThresholds`]:
//!
//! | slope                      | type                         |
//! |----------------------------|------------------------------|
//! | `u1 < def_neu`             | [`PlayerType::Defector`]     |
//! | `def_neu <= u1 <= neu_col` | [`PlayerType::Neutral`]      |
//! | `u1 > neu_col`             | [`PlayerType::Collaborator`] |

use serde::{Deserialize, Serialize};
use stargrid_stats::regression::{self, LineFit};

use crate::{
    game::GameRecord,
    player::{PlayerKey, PlayerRecord},
};

/// Factor mapping a cell value onto the fitted abscissa.
pub const SLOPE_SCALE: f64 = 5.0 / 99.0;

/// Behavioral type of a player.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum PlayerType {
    #[display("defector")]
    Defector,
    #[display("neutral")]
    Neutral,
    #[display("collaborator")]
    Collaborator,
}

impl PlayerType {
    pub const ALL: [Self; 3] = [Self::Defector, Self::Neutral, Self::Collaborator];
}

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("thresholds must be finite with def_neu < neu_col (got {def_neu}, {neu_col})")]
pub struct InvalidThresholdsError {
    pub def_neu: f64,
    pub neu_col: f64,
}

/// Slope boundaries between behavioral types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationThresholds {
    def_neu: f64,
    neu_col: f64,
}

impl ClassificationThresholds {
    pub fn new(def_neu: f64, neu_col: f64) -> Result<Self, InvalidThresholdsError> {
        if !def_neu.is_finite() || !neu_col.is_finite() || def_neu >= neu_col {
            return Err(InvalidThresholdsError { def_neu, neu_col });
        }
        Ok(Self { def_neu, neu_col })
    }

    /// Boundary between defectors and neutrals.
    #[must_use]
    pub fn def_neu(&self) -> f64 {
        self.def_neu
    }

    /// Boundary between neutrals and collaborators.
    #[must_use]
    pub fn neu_col(&self) -> f64 {
        self.neu_col
    }

    /// Labels a fitted slope.
    ///
    /// # Examples
    ///
    /// ```
    /// use stargrid_analysis::classify::{ClassificationThresholds, PlayerType};
    ///
    /// let thresholds = ClassificationThresholds::new(-0.3, 0.3).unwrap();
    /// assert_eq!(thresholds.classify_slope(-0.5), PlayerType::Defector);
    /// assert_eq!(thresholds.classify_slope(-0.3), PlayerType::Neutral);
    /// assert_eq!(thresholds.classify_slope(0.3), PlayerType::Neutral);
    /// assert_eq!(thresholds.classify_slope(0.4), PlayerType::Collaborator);
    /// ```
    #[must_use]
    pub fn classify_slope(&self, slope: f64) -> PlayerType {
        if slope > self.neu_col {
            PlayerType::Collaborator
        } else if slope < self.def_neu {
            PlayerType::Defector
        } else {
            PlayerType::Neutral
        }
    }
}

/// The fit of a player's mean stars could not be computed.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
#[display("cannot fit stars of player {player}: {source}")]
pub struct FitConvergenceError {
    pub player: PlayerKey,
    pub source: regression::FitConvergenceError,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    /// `u0`, the mean stars predicted for value 0.
    pub intercept: f64,
    /// `u1`, the mean-stars change across the value range.
    pub slope: f64,
    /// Sum of squared residuals of the fit.
    pub residual_sq_error: f64,
    pub player_type: PlayerType,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifiedPlayer<'a> {
    pub player: &'a PlayerRecord,
    pub classification: Classification,
}

impl ClassifiedPlayer<'_> {
    #[must_use]
    pub fn player_type(&self) -> PlayerType {
        self.classification.player_type
    }
}

/// A game whose players have all been classified.
#[derive(Debug, Clone)]
pub struct ClassifiedGame<'a> {
    pub game: &'a GameRecord,
    pub players: Vec<ClassifiedPlayer<'a>>,
}

impl ClassifiedGame<'_> {
    /// Number of players of type `player_type`.
    #[must_use]
    pub fn count(&self, player_type: PlayerType) -> usize {
        self.players
            .iter()
            .filter(|p| p.player_type() == player_type)
            .count()
    }
}

/// Fits `y = u0 + 5 · u1 · x / 99` to the player's mean stars per value.
///
/// Requires at least two distinct values played.
pub fn fit_stars(player: &PlayerRecord) -> Result<LineFit, FitConvergenceError> {
    let x = player
        .values_played()
        .iter()
        .map(|&v| SLOPE_SCALE * f64::from(v))
        .collect::<Vec<_>>();
    regression::fit_line(&x, player.mean_stars_by_value()).map_err(|source| FitConvergenceError {
        player: player.key().clone(),
        source,
    })
}

/// Fits and labels one player.
pub fn classify(
    player: &PlayerRecord,
    thresholds: &ClassificationThresholds,
) -> Result<Classification, FitConvergenceError> {
    let fit = fit_stars(player)?;
    Ok(Classification {
        intercept: fit.intercept,
        slope: fit.slope,
        residual_sq_error: fit.residual_sq_error,
        player_type: thresholds.classify_slope(fit.slope),
    })
}

/// Classifies every player of `game`.
pub fn classify_game<'a>(
    game: &'a GameRecord,
    thresholds: &ClassificationThresholds,
) -> Result<ClassifiedGame<'a>, FitConvergenceError> {
    let players = game
        .players()
        .iter()
        .map(|player| {
            Ok(ClassifiedPlayer {
                player,
                classification: classify(player, thresholds)?,
            })
        })
        .collect::<Result<Vec<_>, FitConvergenceError>>()?;
    Ok(ClassifiedGame { game, players })
}

/// Classifies every player of every game.
pub fn classify_games<'a>(
    games: &'a [GameRecord],
    thresholds: &ClassificationThresholds,
) -> Result<Vec<ClassifiedGame<'a>>, FitConvergenceError> {
    let classified = games
        .iter()
        .map(|game| classify_game(game, thresholds))
        .collect::<Result<Vec<_>, _>>()?;
    log::info!(
        "classified {} players from {} games",
        classified.iter().map(|g| g.players.len()).sum::<usize>(),
        classified.len()
    );
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::tests::record;

    fn thresholds() -> ClassificationThresholds {
        ClassificationThresholds::new(-0.3, 0.3).unwrap()
    }

    #[test]
    fn test_exact_linear_recovery() {
        // 0 stars at value 0 and 5 stars at value 99: u0 = 0, u1 = 1
        let player = record(1, &[(0, 0), (99, 5)]);
        let fit = fit_stars(&player).unwrap();
        assert!(fit.intercept.abs() < 1e-12);
        assert!((fit.slope - 1.0).abs() < 1e-12);

        // Mean stars 4 at value 0 and 0.5 at value 99
        let player = record(2, &[(0, 4), (0, 4), (99, 0), (99, 1)]);
        let fit = fit_stars(&player).unwrap();
        assert!((fit.intercept - 4.0).abs() < 1e-12);
        assert!((fit.slope + 0.7).abs() < 1e-12);
        assert!(fit.residual_sq_error < 1e-20);
    }

    #[test]
    fn test_player_types() {
        let honest = record(1, &[(0, 0), (12, 1), (44, 2), (71, 4), (99, 5)]);
        let liar = record(2, &[(0, 5), (12, 5), (44, 3), (71, 0), (99, 0)]);
        let flat = record(3, &[(0, 3), (44, 3), (99, 3)]);

        let honest = classify(&honest, &thresholds()).unwrap();
        assert!(honest.slope > 0.3);
        assert_eq!(honest.player_type, PlayerType::Collaborator);

        let liar = classify(&liar, &thresholds()).unwrap();
        assert!(liar.slope < -0.3);
        assert_eq!(liar.player_type, PlayerType::Defector);

        let flat = classify(&flat, &thresholds()).unwrap();
        assert!(flat.slope.abs() < 1e-12);
        assert!((flat.intercept - 3.0).abs() < 1e-12);
        assert!(flat.residual_sq_error < 1e-20);
        assert_eq!(flat.player_type, PlayerType::Neutral);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let player = record(1, &[(0, 1), (40, 3), (85, 4), (99, 4)]);
        let first = classify(&player, &thresholds()).unwrap();
        let second = classify(&player, &thresholds()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_value_fails_with_player_identity() {
        let player = record(7, &[(40, 2), (40, 3)]);
        let err = classify(&player, &thresholds()).unwrap_err();
        assert_eq!(err.player.player, 7);
        assert!(matches!(
            err.source,
            regression::FitConvergenceError::TooFewPoints { actual: 1, .. }
        ));
        assert!(err.to_string().contains("P7"));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(ClassificationThresholds::new(1.0, 1.0).is_err());
        assert!(ClassificationThresholds::new(2.0, 1.0).is_err());
        assert!(ClassificationThresholds::new(f64::NAN, 1.0).is_err());
        assert!(ClassificationThresholds::new(-1.0, 1.0).is_ok());
    }

    #[test]
    fn test_log_to_type_labels() {
        // P1 rates by value, P2 against it.
        let log: crate::record::GameLog = serde_json::from_str(
            r#"{
                "sessionNumber": 4, "groupId": "C", "gameNumber": 1,
                "ruleNumber": 1, "mapType": "R", "mapNumber": 2,
                "numberRounds": 2, "numberPlayers": 2, "mapSize": 2,
                "map": [[0, 33], [66, 99]],
                "actions": [
                    [1, "P1", 0, 0, 0, 0, 0],
                    [1, "P1", 1, 0, 33, 2, 0],
                    [1, "P2", 1, 1, 99, 0, 0],
                    [1, "P2", 0, 1, 66, 1, 0],
                    [2, "P1", 0, 1, 66, 3, 0],
                    [2, "P1", 1, 1, 99, 5, 0],
                    [2, "P2", 1, 1, 99, 0, 0],
                    [2, "P2", 0, 0, 0, 5, 0]
                ]
            }"#,
        )
        .unwrap();
        let game = GameRecord::from_log(&log).unwrap();
        let [p1, p2] = game.players() else {
            panic!("expected two players");
        };

        assert_eq!((p1.score(), p1.rank()), (198, 2));
        assert_eq!((p2.score(), p2.rank()), (264, 1));
        assert_eq!(
            p2.stars_by_value().iter().collect::<Vec<_>>(),
            vec![(&0, &vec![5]), (&66, &vec![1]), (&99, &vec![0, 0])]
        );
        assert_eq!(p2.mean_stars_by_value(), &[5.0, 1.0, 0.0]);

        let classified = classify_game(&game, &thresholds()).unwrap();
        let labels = classified
            .players
            .iter()
            .map(ClassifiedPlayer::player_type)
            .collect::<Vec<_>>();
        assert_eq!(labels, vec![PlayerType::Collaborator, PlayerType::Defector]);
        assert!((classified.players[0].classification.slope - 0.96).abs() < 1e-9);
    }
}
