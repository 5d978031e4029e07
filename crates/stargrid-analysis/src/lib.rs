//! Behavioral analysis of resource-discovery game logs
//!
//! Players explore a hidden map of valued cells over several rounds, rating
//! each visited cell with 0 to 5 stars that the other players can see. This
//! crate turns the recorded games into per-player behavioral records,
//! classifies each player by how honestly their ratings track the cell values,
//! and computes bootstrapped observables on top of the classification.
//!
//! # Workflow
//!
//! 1. **Load games** ([`record::GameLog`] → [`game::GameRecord`]): validate the
//!    logs and build one [`player::PlayerRecord`] per player, with scores and
//!    ranks
//! 2. **Discover thresholds** ([`thresholds::discover_thresholds`]): cluster
//!    the fitted slopes of a large pooled sample into three behavioral types
//! 3. **Classify** ([`classify::classify_games`]): label each player as
//!    defector, neutral or collaborator
//! 4. **Observe** ([`observables`]): estimate rank proportions, the effect of
//!    defectors on team score, star statistics and star models per value,
//!    score distributions, exploration and revisit observables, each with
//!    bootstrap intervals
//!
//! # Modules
//!
//! - [`record`]: Game log input model and validation
//! - [`player`]: Per-player behavioral records and ranking
//! - [`top_values`]: Running top-3 values found
//! - [`game`]: Game records and per-round exploration observables
//! - [`classify`]: Slope fit and behavioral type classification
//! - [`thresholds`]: Ward clustering of slopes into type thresholds
//! - [`binning`]: Grouping of cell values into bins
//! - [`observables`]: Bootstrapped observables
//!
//! # Example
//!
//! ```
//! use stargrid_analysis::{
//!     classify::{ClassificationThresholds, PlayerType, classify_games},
//!     game::GameRecord,
//!     record::GameLog,
//! };
//!
//! let log: GameLog = serde_json::from_str(r#"{
//!     "sessionNumber": 1, "groupId": "A", "gameNumber": 1,
//!     "ruleNumber": 1, "mapType": "R", "mapNumber": 1,
//!     "numberRounds": 1, "numberPlayers": 1, "mapSize": 2,
//!     "map": [[0, 99], [40, 12]],
//!     "actions": [[1, "P1", 0, 0, 0, 0, 0], [1, "P1", 1, 0, 99, 5, 99]]
//! }"#).unwrap();
//!
//! let games = vec![GameRecord::from_log(&log).unwrap()];
//! let thresholds = ClassificationThresholds::new(-0.3, 0.3).unwrap();
//! let classified = classify_games(&games, &thresholds).unwrap();
//! assert_eq!(classified[0].players[0].player_type(), PlayerType::Collaborator);
//! ```

pub mod binning;
pub mod classify;
pub mod game;
pub mod observables;
pub mod player;
pub mod record;
pub mod thresholds;
pub mod top_values;
