//! Seeded in-memory loaders.
//!
//! These exercise the full [`DatasetLoader`] contract so the sandbox,
//! pipeline, and server can be tested end to end without an external data
//! service. The rosters are illustrative, not real league data.

use serde_json::{Value, json};

use crate::loader::{DatasetLoader, LoaderError, LoaderParams, ParamSpec};
use crate::table::Table;

/// Columns of the `player_stats` loader.
const PLAYER_COLUMNS: [&str; 12] = [
    "player_id",
    "player_name",
    "team",
    "position",
    "season",
    "games",
    "rushing_yards",
    "rushing_tds",
    "receiving_yards",
    "receptions",
    "passing_yards",
    "passing_tds",
];

/// Columns of the `team_stats` loader.
const TEAM_COLUMNS: [&str; 6] = [
    "team",
    "season",
    "wins",
    "losses",
    "points_for",
    "points_against",
];

#[allow(clippy::too_many_arguments)]
fn player_row(
    id: &str,
    name: &str,
    team: &str,
    position: &str,
    season: i64,
    games: i64,
    rushing_yards: i64,
    rushing_tds: i64,
    receiving_yards: i64,
    receptions: i64,
    passing_yards: i64,
    passing_tds: i64,
) -> Vec<Value> {
    vec![
        json!(id),
        json!(name),
        json!(team),
        json!(position),
        json!(season),
        json!(games),
        json!(rushing_yards),
        json!(rushing_tds),
        json!(receiving_yards),
        json!(receptions),
        json!(passing_yards),
        json!(passing_tds),
    ]
}

/// Per-player season statistics.
pub struct PlayerStatsLoader {
    rows: Vec<Vec<Value>>,
}

impl PlayerStatsLoader {
    /// Loader seeded with two seasons of sample players.
    ///
    /// The 2025 roster includes two distinct players named "Jordan Banks"
    /// so uniqueness-constraint failures are reproducible.
    #[must_use]
    pub fn with_sample_data() -> Self {
        let rows = vec![
            // 2025 season
            player_row("HB-0001", "Marcus Vell", "DEN", "RB", 2025, 17, 1642, 14, 310, 38, 0, 0),
            player_row("HB-0002", "DeShawn Cole", "ATL", "RB", 2025, 16, 1488, 11, 402, 45, 0, 0),
            player_row("HB-0003", "Trey Okafor", "BAL", "RB", 2025, 17, 1365, 9, 188, 22, 0, 0),
            player_row("HB-0004", "Eli Navarro", "SF", "RB", 2025, 15, 1207, 8, 510, 52, 0, 0),
            player_row("HB-0005", "Cam Whitfield", "DET", "RB", 2025, 17, 1104, 12, 256, 30, 0, 0),
            player_row("HB-0006", "Rico Sandoval", "KC", "RB", 2025, 16, 987, 6, 344, 41, 0, 0),
            player_row("QB-0001", "Jordan Banks", "BUF", "QB", 2025, 17, 531, 7, 0, 0, 4388, 32),
            player_row("LB-0001", "Jordan Banks", "JAX", "LB", 2025, 16, 0, 0, 0, 0, 0, 0),
            player_row("QB-0002", "Austin Reyes", "CIN", "QB", 2025, 17, 112, 2, 0, 0, 4710, 38),
            player_row("WR-0001", "Malik Turner", "MIA", "WR", 2025, 17, 44, 0, 1512, 104, 0, 0),
            player_row("WR-0002", "Dante Price", "MIN", "WR", 2025, 16, 12, 0, 1433, 98, 0, 0),
            // 2024 season
            player_row("HB-0001", "Marcus Vell", "DEN", "RB", 2024, 16, 1390, 10, 280, 33, 0, 0),
            player_row("HB-0003", "Trey Okafor", "BAL", "RB", 2024, 17, 1501, 12, 201, 25, 0, 0),
            player_row("HB-0004", "Eli Navarro", "SF", "RB", 2024, 17, 1322, 9, 488, 50, 0, 0),
            player_row("QB-0001", "Jordan Banks", "BUF", "QB", 2024, 17, 488, 9, 0, 0, 4102, 29),
            player_row("WR-0001", "Malik Turner", "MIA", "WR", 2024, 15, 31, 0, 1287, 90, 0, 0),
        ];
        Self { rows }
    }
}

impl DatasetLoader for PlayerStatsLoader {
    fn name(&self) -> &str {
        "player_stats"
    }

    fn description(&self) -> &str {
        "Per-player season statistics (rushing, receiving, passing)"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "season",
            "Season year to load, e.g. 2025. Omit for all seasons.",
        )]
    }

    fn columns(&self) -> Vec<String> {
        PLAYER_COLUMNS.iter().map(ToString::to_string).collect()
    }

    fn load(&self, params: &LoaderParams) -> Result<Table, LoaderError> {
        if params.week.is_some() {
            return Err(LoaderError::UnsupportedParam {
                message: "player_stats is season-level; the week parameter is not supported"
                    .into(),
            });
        }
        let mut table = Table::new(self.columns());
        let season_idx = 4; // position of "season" in PLAYER_COLUMNS
        for row in &self.rows {
            if let Some(season) = params.season {
                if row[season_idx] != json!(season) {
                    continue;
                }
            }
            table.push_row(row.clone());
        }
        Ok(table)
    }
}

/// Per-team season standings and scoring.
pub struct TeamStatsLoader {
    rows: Vec<Vec<Value>>,
}

impl TeamStatsLoader {
    /// Loader seeded with two seasons of sample teams.
    #[must_use]
    pub fn with_sample_data() -> Self {
        let team = |team: &str, season: i64, wins: i64, losses: i64, pf: i64, pa: i64| {
            vec![
                json!(team),
                json!(season),
                json!(wins),
                json!(losses),
                json!(pf),
                json!(pa),
            ]
        };
        let rows = vec![
            team("DEN", 2025, 12, 5, 438, 350),
            team("ATL", 2025, 10, 7, 401, 388),
            team("BAL", 2025, 13, 4, 472, 311),
            team("SF", 2025, 11, 6, 429, 345),
            team("BUF", 2025, 13, 4, 501, 362),
            team("CIN", 2025, 9, 8, 455, 460),
            team("DEN", 2024, 9, 8, 380, 372),
            team("BAL", 2024, 12, 5, 460, 330),
        ];
        Self { rows }
    }
}

impl DatasetLoader for TeamStatsLoader {
    fn name(&self) -> &str {
        "team_stats"
    }

    fn description(&self) -> &str {
        "Per-team season standings and scoring"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "season",
            "Season year to load, e.g. 2025. Omit for all seasons.",
        )]
    }

    fn columns(&self) -> Vec<String> {
        TEAM_COLUMNS.iter().map(ToString::to_string).collect()
    }

    fn load(&self, params: &LoaderParams) -> Result<Table, LoaderError> {
        if params.week.is_some() {
            return Err(LoaderError::UnsupportedParam {
                message: "team_stats is season-level; the week parameter is not supported".into(),
            });
        }
        let mut table = Table::new(self.columns());
        let season_idx = 1; // position of "season" in TEAM_COLUMNS
        for row in &self.rows {
            if let Some(season) = params.season {
                if row[season_idx] != json!(season) {
                    continue;
                }
            }
            table.push_row(row.clone());
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn player_stats_filters_by_season() {
        let loader = PlayerStatsLoader::with_sample_data();
        let all = loader.load(&LoaderParams::default()).unwrap();
        let s2025 = loader
            .load(&LoaderParams {
                season: Some(2025),
                week: None,
            })
            .unwrap();
        assert!(s2025.len() < all.len());
        assert!(!s2025.is_empty());
        let season_idx = s2025.column_index("season").unwrap();
        assert!(s2025.rows.iter().all(|r| r[season_idx] == json!(2025)));
    }

    #[test]
    fn player_stats_rejects_week_param() {
        let loader = PlayerStatsLoader::with_sample_data();
        let result = loader.load(&LoaderParams {
            season: Some(2025),
            week: Some(3),
        });
        assert_matches!(result, Err(LoaderError::UnsupportedParam { .. }));
    }

    #[test]
    fn player_stats_columns_match_rows() {
        let loader = PlayerStatsLoader::with_sample_data();
        let table = loader.load(&LoaderParams::default()).unwrap();
        for row in &table.rows {
            assert_eq!(row.len(), table.columns.len());
        }
    }

    #[test]
    fn sample_data_contains_name_collision() {
        let loader = PlayerStatsLoader::with_sample_data();
        let table = loader
            .load(&LoaderParams {
                season: Some(2025),
                week: None,
            })
            .unwrap();
        let name_idx = table.column_index("player_name").unwrap();
        let id_idx = table.column_index("player_id").unwrap();
        let banks_ids: std::collections::BTreeSet<_> = table
            .rows
            .iter()
            .filter(|r| r[name_idx] == json!("Jordan Banks"))
            .map(|r| r[id_idx].to_string())
            .collect();
        assert_eq!(banks_ids.len(), 2, "two distinct players share the name");
    }

    #[test]
    fn team_stats_loads_season() {
        let loader = TeamStatsLoader::with_sample_data();
        let table = loader
            .load(&LoaderParams {
                season: Some(2024),
                week: None,
            })
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn unknown_season_yields_empty_table() {
        let loader = TeamStatsLoader::with_sample_data();
        let table = loader
            .load(&LoaderParams {
                season: Some(1999),
                week: None,
            })
            .unwrap();
        assert!(table.is_empty());
    }
}
