//! Game log input model
//!
//! A [`GameLog`] is the self-contained description of one played game: the
//! game configuration, the hidden map and every action taken by every player.
//! It is the only input format consumed by this crate.
//!
//! # Serialization
//!
//! Game logs use the camelCase field names of the game server. Actions are
//! compact 7-element arrays `[round, playerId, cellX, cellY, value, stars, score]`:
//!
//! ```json
//! {
//!   "sessionNumber": 1, "groupId": "A", "gameNumber": 1,
//!   "ruleNumber": 1, "mapType": "R", "mapNumber": 1,
//!   "numberRounds": 2, "numberPlayers": 2, "mapSize": 2,
//!   "map": [[10, 40], [99, 0]],
//!   "actions": [[1, "P1", 0, 0, 10, 3, 10], [1, "P2", 1, 1, 0, 5, 0]]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a map cell, `cell_y * map_size + cell_x`.
pub type CellIndex = usize;

/// Identity of a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId {
    pub session: u32,
    pub group: String,
    pub game_number: u32,
    pub rule: u32,
    pub map_type: String,
    pub map_number: u32,
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S{:02}-{}{}-R{}-M{}-{:02}",
            self.session, self.group, self.game_number, self.rule, self.map_type, self.map_number
        )
    }
}

/// One recorded game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLog {
    pub session_number: u32,
    pub group_id: String,
    pub game_number: u32,
    pub rule_number: u32,
    pub map_type: String,
    #[serde(default)]
    pub map_number: u32,
    pub number_rounds: usize,
    pub number_players: usize,
    pub map_size: usize,
    /// Hidden cell values, `map[cell_y][cell_x]`.
    pub map: Vec<Vec<u32>>,
    pub actions: Vec<ActionRow>,
}

impl GameLog {
    #[must_use]
    pub fn id(&self) -> GameId {
        GameId {
            session: self.session_number,
            group: self.group_id.clone(),
            game_number: self.game_number,
            rule: self.rule_number,
            map_type: self.map_type.clone(),
            map_number: self.map_number,
        }
    }
}

/// One action: a player visiting a cell during a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawActionRow", into = "RawActionRow")]
pub struct ActionRow {
    /// 1-based round number.
    pub round: usize,
    /// Encoded player id such as `"P3"`.
    pub player_id: String,
    pub cell_x: usize,
    pub cell_y: usize,
    pub value: u32,
    pub stars: u32,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawActionRow(usize, String, usize, usize, u32, u32, i64);

impl From<RawActionRow> for ActionRow {
    fn from(RawActionRow(round, player_id, cell_x, cell_y, value, stars, score): RawActionRow) -> Self {
        Self {
            round,
            player_id,
            cell_x,
            cell_y,
            value,
            stars,
            score,
        }
    }
}

impl From<ActionRow> for RawActionRow {
    fn from(row: ActionRow) -> Self {
        Self(
            row.round,
            row.player_id,
            row.cell_x,
            row.cell_y,
            row.value,
            row.stars,
            row.score,
        )
    }
}

/// A visit of one cell, as stored in a player's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub cell: CellIndex,
    pub value: u32,
    pub stars: u32,
}

/// A game log violates the shape the analysis relies on.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MalformedRecordError {
    #[display("{game}: cannot read a player number from id {player_id:?}")]
    InvalidPlayerId { game: GameId, player_id: String },
    #[display("{game}: player {player} is outside 1..={number_players}")]
    UnknownPlayer {
        game: GameId,
        player: usize,
        number_players: usize,
    },
    #[display("{game}: round {round} is outside 1..={number_rounds}")]
    RoundOutOfRange {
        game: GameId,
        round: usize,
        number_rounds: usize,
    },
    #[display("{game}: no action recorded in round {round}")]
    MissingRound { game: GameId, round: usize },
    #[display("{game}: player {player} has no recorded action")]
    MissingPlayer { game: GameId, player: usize },
    #[display("{game}: cell ({cell_x}, {cell_y}) is outside the {map_size}x{map_size} map")]
    CellOutOfMap {
        game: GameId,
        cell_x: usize,
        cell_y: usize,
        map_size: usize,
    },
    #[display("{game}: map is not {map_size}x{map_size}")]
    MapShape { game: GameId, map_size: usize },
}

/// Extracts the player number from an encoded id such as `"P3"`.
///
/// The number is formed by the trailing ASCII digits of the id.
///
/// # Examples
///
/// ```
/// use stargrid_analysis::record::parse_player_number;
///
/// assert_eq!(parse_player_number("P3"), Some(3));
/// assert_eq!(parse_player_number("P12"), Some(12));
/// assert_eq!(parse_player_number("P"), None);
/// ```
#[must_use]
pub fn parse_player_number(player_id: &str) -> Option<usize> {
    let prefix_len = player_id.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    player_id[prefix_len..].parse().ok()
}

/// Validates the structure of a game log and returns the actions grouped by
/// player (index `player - 1`) and round (index `round - 1`).
pub(crate) fn group_actions(
    log: &GameLog,
) -> Result<Vec<Vec<Vec<(ActionRow, CellIndex)>>>, MalformedRecordError> {
    let game = log.id();
    if log.map.len() != log.map_size || log.map.iter().any(|row| row.len() != log.map_size) {
        return Err(MalformedRecordError::MapShape {
            game,
            map_size: log.map_size,
        });
    }

    let mut grouped = vec![vec![vec![]; log.number_rounds]; log.number_players];
    let mut round_seen = vec![false; log.number_rounds];
    for row in &log.actions {
        let player = parse_player_number(&row.player_id).ok_or_else(|| {
            MalformedRecordError::InvalidPlayerId {
                game: game.clone(),
                player_id: row.player_id.clone(),
            }
        })?;
        if !(1..=log.number_players).contains(&player) {
            return Err(MalformedRecordError::UnknownPlayer {
                game,
                player,
                number_players: log.number_players,
            });
        }
        if !(1..=log.number_rounds).contains(&row.round) {
            return Err(MalformedRecordError::RoundOutOfRange {
                game,
                round: row.round,
                number_rounds: log.number_rounds,
            });
        }
        if row.cell_x >= log.map_size || row.cell_y >= log.map_size {
            return Err(MalformedRecordError::CellOutOfMap {
                game,
                cell_x: row.cell_x,
                cell_y: row.cell_y,
                map_size: log.map_size,
            });
        }
        round_seen[row.round - 1] = true;
        let cell = row.cell_y * log.map_size + row.cell_x;
        grouped[player - 1][row.round - 1].push((row.clone(), cell));
    }

    if let Some(missing) = round_seen.iter().position(|seen| !seen) {
        return Err(MalformedRecordError::MissingRound {
            game,
            round: missing + 1,
        });
    }
    if let Some(silent) = grouped.iter().position(|rounds| rounds.iter().all(Vec::is_empty)) {
        return Err(MalformedRecordError::MissingPlayer {
            game,
            player: silent + 1,
        });
    }
    Ok(grouped)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a small valid log; tests mutate it to introduce defects.
    pub(crate) fn sample_log() -> GameLog {
        serde_json::from_str(
            r#"{
                "sessionNumber": 3, "groupId": "B", "gameNumber": 2,
                "ruleNumber": 1, "mapType": "R", "mapNumber": 7,
                "numberRounds": 2, "numberPlayers": 2, "mapSize": 2,
                "map": [[10, 40], [99, 0]],
                "actions": [
                    [1, "P1", 0, 0, 10, 1, 4],
                    [1, "P1", 1, 0, 40, 2, 6],
                    [1, "P2", 0, 1, 99, 5, 20],
                    [1, "P2", 1, 1, 0, 0, 0],
                    [2, "P1", 1, 0, 40, 4, 8],
                    [2, "P1", 0, 1, 99, 3, 9],
                    [2, "P2", 0, 1, 99, 1, 2],
                    [2, "P2", 0, 0, 10, 5, 1]
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_game_id_display() {
        assert_eq!(sample_log().id().to_string(), "S03-B2-R1-MR-07");
    }

    #[test]
    fn test_action_row_array_roundtrip() {
        let log = sample_log();
        assert_eq!(log.actions[2].player_id, "P2");
        assert_eq!(log.actions[2].value, 99);
        let json = serde_json::to_string(&log.actions[2]).unwrap();
        assert_eq!(json, r#"[1,"P2",0,1,99,5,20]"#);
    }

    #[test]
    fn test_group_actions() {
        let grouped = group_actions(&sample_log()).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0][1].len(), 2);
        let cells = grouped[1][0].iter().map(|(_, c)| *c).collect::<Vec<_>>();
        assert_eq!(cells, vec![2, 3]);
    }

    #[test]
    fn test_unknown_player() {
        let mut log = sample_log();
        log.actions[0].player_id = "P3".to_owned();
        assert!(matches!(
            group_actions(&log),
            Err(MalformedRecordError::UnknownPlayer { player: 3, .. })
        ));
        log.actions[0].player_id = "anonymous".to_owned();
        assert!(matches!(
            group_actions(&log),
            Err(MalformedRecordError::InvalidPlayerId { .. })
        ));
    }

    #[test]
    fn test_rounds_must_be_dense() {
        let mut log = sample_log();
        log.number_rounds = 3;
        assert!(matches!(
            group_actions(&log),
            Err(MalformedRecordError::MissingRound { round: 3, .. })
        ));
        log.number_rounds = 2;
        log.actions[0].round = 0;
        assert!(matches!(
            group_actions(&log),
            Err(MalformedRecordError::RoundOutOfRange { round: 0, .. })
        ));
    }

    #[test]
    fn test_declared_player_without_actions() {
        let mut log = sample_log();
        log.number_players = 3;
        assert!(matches!(
            group_actions(&log),
            Err(MalformedRecordError::MissingPlayer { player: 3, .. })
        ));
    }

    #[test]
    fn test_cell_out_of_map() {
        let mut log = sample_log();
        log.actions[0].cell_x = 2;
        assert!(matches!(
            group_actions(&log),
            Err(MalformedRecordError::CellOutOfMap { cell_x: 2, .. })
        ));
    }
}
