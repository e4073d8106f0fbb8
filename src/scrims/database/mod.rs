use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

/// Hard roster cap: a scrims team fields exactly five players.
pub const TEAM_CAPACITY: i64 = 5;

/// Player ids are drawn from `000`..=`999`.
pub const ID_POOL_SIZE: usize = 1000;

const READ_RETRY_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("season '{0}' already exists")]
    DuplicateSeason(String),
    #[error("storage error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, FromRow)]
pub struct Season {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct Player {
    pub id: String,
    pub discord_id: i64,
    pub ingame_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub season_id: i64,
}

/// One player's line in a recorded 5v5 match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub player_id: String,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
}

/// Per-season stat totals for one player, in season creation order.
#[derive(Debug, Clone, FromRow)]
pub struct SeasonPerformance {
    pub season_name: String,
    pub total_kills: i64,
    pub total_deaths: i64,
    pub total_assists: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardEntry {
    pub ingame_name: String,
    pub total_kills: i64,
    pub total_deaths: i64,
}

/// Outcome of `ensure_player`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdAssignment {
    /// A fresh id was drawn and persisted for this account.
    Assigned(String),
    /// The account already had an id; nothing was written.
    AlreadyAssigned(String),
    /// Every id in `000`..=`999` is taken. Onboarding is blocked.
    PoolExhausted,
}

/// Outcome of `assign_player`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterChange {
    Added,
    TeamFull,
    AlreadyInTeam,
    TeamNotFound,
    PlayerNotFound,
}

/// Picks a random unassigned id and inserts the player row in one statement,
/// so two concurrent draws can never observe the same free id.
const DRAW_PLAYER_ID: &str = r#"
    WITH RECURSIVE id_pool(n) AS (
        SELECT 0
        UNION ALL
        SELECT n + 1 FROM id_pool WHERE n < 999
    )
    INSERT INTO players (id, discord_id)
    SELECT printf('%03d', n), $1
    FROM id_pool
    WHERE printf('%03d', n) NOT IN (SELECT id FROM players)
    ORDER BY RANDOM()
    LIMIT 1
    RETURNING id
"#;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS seasons (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        is_active BOOLEAN NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS players (
        id TEXT PRIMARY KEY,
        discord_id INTEGER NOT NULL UNIQUE,
        ingame_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        season_id INTEGER NOT NULL,
        FOREIGN KEY (season_id) REFERENCES seasons (id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS team_members (
        team_id INTEGER NOT NULL,
        player_id TEXT NOT NULL,
        PRIMARY KEY (team_id, player_id),
        FOREIGN KEY (team_id) REFERENCES teams (id) ON DELETE CASCADE,
        FOREIGN KEY (player_id) REFERENCES players (id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS match_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        season_id INTEGER NOT NULL,
        player_id TEXT NOT NULL,
        kills INTEGER NOT NULL,
        deaths INTEGER NOT NULL,
        assists INTEGER NOT NULL,
        FOREIGN KEY (season_id) REFERENCES seasons (id) ON DELETE CASCADE,
        FOREIGN KEY (player_id) REFERENCES players (id) ON DELETE CASCADE
    )
    "#,
];

/// The relational store behind every bot command. Owns the connection pool;
/// each public operation is self-contained and safe to call concurrently.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens the pool. Foreign keys are switched on per connection so that
    /// season and team deletes cascade.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the tables if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Retries an idempotent read once after a short backoff if the first
    /// attempt failed with a transient pool or connection error.
    async fn read_retry<T, Fut>(&self, op: impl Fn(SqlitePool) -> Fut) -> Result<T, sqlx::Error>
    where
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        match op(self.pool.clone()).await {
            Err(err) if is_transient(&err) => {
                tracing::warn!("transient storage error, retrying read: {err}");
                tokio::time::sleep(READ_RETRY_BACKOFF).await;
                op(self.pool.clone()).await
            }
            other => other,
        }
    }

    /// Assigns a permanent 3-digit id to a Discord account, drawing uniformly
    /// at random from the unassigned part of the pool.
    ///
    /// The draw and the insert are one statement, so concurrent calls cannot
    /// hand out the same id. A lost race on `discord_id` resolves to the
    /// winner's row; a lost race on the id value itself is retried once.
    pub async fn ensure_player(&self, discord_id: i64) -> Result<IdAssignment, StoreError> {
        if let Some(player) = self.find_player(discord_id).await? {
            return Ok(IdAssignment::AlreadyAssigned(player.id));
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            match sqlx::query_as::<_, (String,)>(DRAW_PLAYER_ID)
                .bind(discord_id)
                .fetch_optional(&self.pool)
                .await
            {
                Ok(Some((id,))) => return Ok(IdAssignment::Assigned(id)),
                Ok(None) => return Ok(IdAssignment::PoolExhausted),
                Err(err) if is_unique_violation(&err) => {
                    if let Some(player) = self.find_player(discord_id).await? {
                        return Ok(IdAssignment::AlreadyAssigned(player.id));
                    }
                    if attempts >= 2 {
                        return Err(err.into());
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Sets the in-game name for the player mapped to `discord_id`. Returns
    /// false if no such player exists.
    pub async fn set_ingame_name(&self, discord_id: i64, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE players SET ingame_name = $1 WHERE discord_id = $2")
            .bind(name)
            .bind(discord_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_player(&self, discord_id: i64) -> Result<Option<Player>, StoreError> {
        let player = self
            .read_retry(|pool| async move {
                sqlx::query_as::<_, Player>(
                    "SELECT id, discord_id, ingame_name FROM players WHERE discord_id = $1",
                )
                .bind(discord_id)
                .fetch_optional(&pool)
                .await
            })
            .await?;
        Ok(player)
    }

    pub async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StoreError> {
        let player = self
            .read_retry(|pool| async move {
                sqlx::query_as::<_, Player>(
                    "SELECT id, discord_id, ingame_name FROM players WHERE ingame_name = $1",
                )
                .bind(name)
                .fetch_optional(&pool)
                .await
            })
            .await?;
        Ok(player)
    }

    /// Creates a new season and makes it the active one. Deactivation of the
    /// previous season and the insert commit together, so a reader never sees
    /// zero or two active seasons.
    pub async fn create_season(&self, name: &str) -> Result<Season, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE seasons SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await?;
        let inserted = sqlx::query_as::<_, Season>(
            "INSERT INTO seasons (name, is_active) VALUES ($1, 1) RETURNING id, name, is_active",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await;
        match inserted {
            Ok(season) => {
                tx.commit().await?;
                Ok(season)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::DuplicateSeason(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_active_season(&self) -> Result<Option<Season>, StoreError> {
        let season = self
            .read_retry(|pool| async move {
                sqlx::query_as::<_, Season>(
                    "SELECT id, name, is_active FROM seasons WHERE is_active = 1",
                )
                .fetch_optional(&pool)
                .await
            })
            .await?;
        Ok(season)
    }

    /// Deletes a season by name. Cascades to its teams, their memberships and
    /// its match results; player rows are untouched. Returns false if no
    /// season with that name exists.
    pub async fn delete_season(&self, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM seasons WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_team(&self, name: &str, season_id: i64) -> Result<Team, StoreError> {
        let team = sqlx::query_as::<_, Team>(
            "INSERT INTO teams (name, season_id) VALUES ($1, $2) RETURNING id, name, season_id",
        )
        .bind(name)
        .bind(season_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(team)
    }

    pub async fn find_team(&self, name: &str, season_id: i64) -> Result<Option<Team>, StoreError> {
        let team = self
            .read_retry(|pool| async move {
                sqlx::query_as::<_, Team>(
                    "SELECT id, name, season_id FROM teams WHERE name = $1 AND season_id = $2",
                )
                .bind(name)
                .bind(season_id)
                .fetch_optional(&pool)
                .await
            })
            .await?;
        Ok(team)
    }

    /// Adds a player to the roster of the named team in the given season.
    ///
    /// A player may belong to at most one team per season, and a roster holds
    /// at most [`TEAM_CAPACITY`] players. The capacity check and the insert
    /// are a single conditional statement inside the transaction, so two
    /// concurrent assignments cannot push a roster past the cap.
    pub async fn assign_player(
        &self,
        player_id: &str,
        team_name: &str,
        season_id: i64,
    ) -> Result<RosterChange, StoreError> {
        let mut tx = self.pool.begin().await?;

        let team = sqlx::query_as::<_, Team>(
            "SELECT id, name, season_id FROM teams WHERE name = $1 AND season_id = $2",
        )
        .bind(team_name)
        .bind(season_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(team) = team else {
            return Ok(RosterChange::TeamNotFound);
        };

        let existing = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT tm.team_id
            FROM team_members tm
            JOIN teams t ON tm.team_id = t.id
            WHERE tm.player_id = $1 AND t.season_id = $2
            "#,
        )
        .bind(player_id)
        .bind(season_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Ok(RosterChange::AlreadyInTeam);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO team_members (team_id, player_id)
            SELECT ?1, ?2
            WHERE (SELECT COUNT(*) FROM team_members WHERE team_id = ?1) < ?3
            "#,
        )
        .bind(team.id)
        .bind(player_id)
        .bind(TEAM_CAPACITY)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(result) if result.rows_affected() == 0 => Ok(RosterChange::TeamFull),
            Ok(_) => {
                tx.commit().await?;
                Ok(RosterChange::Added)
            }
            // Backstop for races the advisory checks above lost.
            Err(err) if is_unique_violation(&err) => Ok(RosterChange::AlreadyInTeam),
            Err(err) if is_foreign_key_violation(&err) => Ok(RosterChange::PlayerNotFound),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a player from the named team's roster. Returns false if the
    /// team does not exist or the player is not a member.
    pub async fn unassign_player(
        &self,
        player_id: &str,
        team_name: &str,
        season_id: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM team_members
            WHERE player_id = $1
              AND team_id = (SELECT id FROM teams WHERE name = $2 AND season_id = $3)
            "#,
        )
        .bind(player_id)
        .bind(team_name)
        .bind(season_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persists one recorded match: one row per entry, all tagged with the
    /// season and committed as a single transaction. A failure rolls back the
    /// whole batch rather than leaving a partial match behind.
    pub async fn record_match(
        &self,
        season_id: i64,
        entries: &[MatchEntry],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO match_results (season_id, player_id, kills, deaths, assists)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(season_id)
            .bind(&entry.player_id)
            .bind(entry.kills)
            .bind(entry.deaths)
            .bind(entry.assists)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Per-season stat totals for the player with the given in-game name,
    /// ordered by season creation order.
    pub async fn performance(
        &self,
        ingame_name: &str,
    ) -> Result<Vec<SeasonPerformance>, StoreError> {
        let rows = self
            .read_retry(|pool| async move {
                sqlx::query_as::<_, SeasonPerformance>(
                    r#"
                    SELECT s.name AS season_name,
                           SUM(mr.kills) AS total_kills,
                           SUM(mr.deaths) AS total_deaths,
                           SUM(mr.assists) AS total_assists
                    FROM match_results mr
                    JOIN players p ON mr.player_id = p.id
                    JOIN seasons s ON mr.season_id = s.id
                    WHERE p.ingame_name = $1
                    GROUP BY s.id, s.name
                    ORDER BY s.id
                    "#,
                )
                .bind(ingame_name)
                .fetch_all(&pool)
                .await
            })
            .await?;
        Ok(rows)
    }

    /// Active-season ranking by K/D, best first. Players with zero recorded
    /// deaths are excluded so every ranked ratio is well defined.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let Some(season) = self.get_active_season().await? else {
            return Ok(Vec::new());
        };
        let season_id = season.id;
        let rows = self
            .read_retry(|pool| async move {
                sqlx::query_as::<_, LeaderboardEntry>(
                    r#"
                    SELECT p.ingame_name AS ingame_name,
                           SUM(mr.kills) AS total_kills,
                           SUM(mr.deaths) AS total_deaths
                    FROM match_results mr
                    JOIN players p ON mr.player_id = p.id
                    WHERE mr.season_id = $1 AND p.ingame_name IS NOT NULL
                    GROUP BY p.ingame_name
                    HAVING SUM(mr.deaths) > 0
                    ORDER BY CAST(SUM(mr.kills) AS REAL) / SUM(mr.deaths) DESC
                    "#,
                )
                .bind(season_id)
                .fetch_all(&pool)
                .await
            })
            .await?;
        Ok(rows)
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation)
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::ForeignKeyViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn memory_store() -> Store {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        let store = Store { pool };
        store.init_schema().await.unwrap();
        store
    }

    async fn assigned_id(store: &Store, discord_id: i64) -> String {
        match store.ensure_player(discord_id).await.unwrap() {
            IdAssignment::Assigned(id) => id,
            other => panic!("expected a fresh id for {discord_id}, got {other:?}"),
        }
    }

    async fn count(store: &Store, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(&store.pool).await.unwrap()
    }

    #[tokio::test]
    async fn assigned_ids_are_distinct_three_digit_strings() {
        let store = memory_store().await;
        let mut seen = HashSet::new();
        for discord_id in 0..200 {
            let id = assigned_id(&store, discord_id).await;
            assert_eq!(id.len(), 3, "id {id} is not zero-padded");
            let value: u32 = id.parse().unwrap();
            assert!(value < 1000);
            assert!(seen.insert(id), "duplicate id handed out");
        }
    }

    #[tokio::test]
    async fn pool_exhaustion_after_all_ids_assigned() {
        let store = memory_store().await;
        for discord_id in 0..ID_POOL_SIZE as i64 {
            assigned_id(&store, discord_id).await;
        }
        let outcome = store.ensure_player(5000).await.unwrap();
        assert_eq!(outcome, IdAssignment::PoolExhausted);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM players").await, 1000);
    }

    #[tokio::test]
    async fn ensure_player_does_not_reassign() {
        let store = memory_store().await;
        let id = assigned_id(&store, 42).await;
        let outcome = store.ensure_player(42).await.unwrap();
        assert_eq!(outcome, IdAssignment::AlreadyAssigned(id));
        assert_eq!(count(&store, "SELECT COUNT(*) FROM players").await, 1);
    }

    #[tokio::test]
    async fn set_ingame_name_requires_an_existing_player() {
        let store = memory_store().await;
        assert!(!store.set_ingame_name(42, "Ace").await.unwrap());

        assigned_id(&store, 42).await;
        assert!(store.set_ingame_name(42, "Ace").await.unwrap());
        let player = store.find_player_by_name("Ace").await.unwrap().unwrap();
        assert_eq!(player.discord_id, 42);

        // Name is mutable.
        assert!(store.set_ingame_name(42, "Blaze").await.unwrap());
        assert!(store.find_player_by_name("Ace").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exactly_one_season_is_active() {
        let store = memory_store().await;
        store.create_season("S1").await.unwrap();
        store.create_season("S2").await.unwrap();
        let active = store.get_active_season().await.unwrap().unwrap();
        assert_eq!(active.name, "S2");
        let active_rows = count(
            &store,
            "SELECT COUNT(*) FROM seasons WHERE is_active = 1",
        )
        .await;
        assert_eq!(active_rows, 1);
    }

    #[tokio::test]
    async fn duplicate_season_name_is_a_conflict() {
        let store = memory_store().await;
        store.create_season("S1").await.unwrap();
        let err = store.create_season("S1").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSeason(name) if name == "S1"));
        // The failed call must not have deactivated the existing season.
        let active = store.get_active_season().await.unwrap().unwrap();
        assert_eq!(active.name, "S1");
    }

    #[tokio::test]
    async fn sixth_assignment_is_rejected_at_capacity() {
        let store = memory_store().await;
        let season = store.create_season("S1").await.unwrap();
        store.create_team("alpha", season.id).await.unwrap();
        for discord_id in 0..5 {
            let id = assigned_id(&store, discord_id).await;
            let change = store.assign_player(&id, "alpha", season.id).await.unwrap();
            assert_eq!(change, RosterChange::Added);
        }
        let sixth = assigned_id(&store, 99).await;
        let change = store.assign_player(&sixth, "alpha", season.id).await.unwrap();
        assert_eq!(change, RosterChange::TeamFull);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM team_members").await, 5);
    }

    #[tokio::test]
    async fn double_assignment_is_rejected() {
        let store = memory_store().await;
        let season = store.create_season("S1").await.unwrap();
        store.create_team("alpha", season.id).await.unwrap();
        let id = assigned_id(&store, 1).await;
        assert_eq!(
            store.assign_player(&id, "alpha", season.id).await.unwrap(),
            RosterChange::Added
        );
        assert_eq!(
            store.assign_player(&id, "alpha", season.id).await.unwrap(),
            RosterChange::AlreadyInTeam
        );
        assert_eq!(count(&store, "SELECT COUNT(*) FROM team_members").await, 1);
    }

    #[tokio::test]
    async fn one_team_per_season() {
        let store = memory_store().await;
        let season = store.create_season("S1").await.unwrap();
        store.create_team("alpha", season.id).await.unwrap();
        store.create_team("bravo", season.id).await.unwrap();
        let id = assigned_id(&store, 1).await;
        assert_eq!(
            store.assign_player(&id, "alpha", season.id).await.unwrap(),
            RosterChange::Added
        );
        assert_eq!(
            store.assign_player(&id, "bravo", season.id).await.unwrap(),
            RosterChange::AlreadyInTeam
        );

        // A new season is a clean slate.
        let next = store.create_season("S2").await.unwrap();
        store.create_team("bravo", next.id).await.unwrap();
        assert_eq!(
            store.assign_player(&id, "bravo", next.id).await.unwrap(),
            RosterChange::Added
        );
    }

    #[tokio::test]
    async fn assignment_reports_missing_team_and_player() {
        let store = memory_store().await;
        let season = store.create_season("S1").await.unwrap();
        let id = assigned_id(&store, 1).await;
        assert_eq!(
            store.assign_player(&id, "ghosts", season.id).await.unwrap(),
            RosterChange::TeamNotFound
        );
        store.create_team("alpha", season.id).await.unwrap();
        assert_eq!(
            store.assign_player("777", "alpha", season.id).await.unwrap(),
            RosterChange::PlayerNotFound
        );
    }

    #[tokio::test]
    async fn unassign_removes_exactly_the_membership() {
        let store = memory_store().await;
        let season = store.create_season("S1").await.unwrap();
        store.create_team("alpha", season.id).await.unwrap();
        let id = assigned_id(&store, 1).await;
        store.assign_player(&id, "alpha", season.id).await.unwrap();

        assert!(store.unassign_player(&id, "alpha", season.id).await.unwrap());
        assert!(!store.unassign_player(&id, "alpha", season.id).await.unwrap());
        assert!(!store.unassign_player(&id, "ghosts", season.id).await.unwrap());
        // The player row survives unassignment.
        assert_eq!(count(&store, "SELECT COUNT(*) FROM players").await, 1);
    }

    #[tokio::test]
    async fn recorded_match_sums_show_up_in_performance() {
        let store = memory_store().await;
        let season = store.create_season("Spring").await.unwrap();
        let ace = assigned_id(&store, 42).await;
        assert!(store.set_ingame_name(42, "Ace").await.unwrap());

        let mut entries = vec![MatchEntry {
            player_id: ace.clone(),
            kills: 10,
            deaths: 2,
            assists: 3,
        }];
        for discord_id in 100..109 {
            entries.push(MatchEntry {
                player_id: assigned_id(&store, discord_id).await,
                kills: 1,
                deaths: 1,
                assists: 1,
            });
        }
        store.record_match(season.id, &entries).await.unwrap();

        let rows = store.performance("Ace").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].season_name, "Spring");
        assert_eq!(rows[0].total_kills, 10);
        assert_eq!(rows[0].total_deaths, 2);
        assert_eq!(rows[0].total_assists, 3);
        assert_eq!(
            count(&store, "SELECT COUNT(*) FROM match_results").await,
            10
        );
    }

    #[tokio::test]
    async fn performance_accumulates_per_season_in_creation_order() {
        let store = memory_store().await;
        let ace = assigned_id(&store, 42).await;
        store.set_ingame_name(42, "Ace").await.unwrap();

        let spring = store.create_season("Spring").await.unwrap();
        let line = |k, d, a| MatchEntry {
            player_id: ace.clone(),
            kills: k,
            deaths: d,
            assists: a,
        };
        store.record_match(spring.id, &[line(5, 2, 1)]).await.unwrap();
        store.record_match(spring.id, &[line(3, 1, 0)]).await.unwrap();
        let summer = store.create_season("Summer").await.unwrap();
        store.record_match(summer.id, &[line(7, 7, 7)]).await.unwrap();

        let rows = store.performance("Ace").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].season_name, "Spring");
        assert_eq!(rows[0].total_kills, 8);
        assert_eq!(rows[0].total_deaths, 3);
        assert_eq!(rows[0].total_assists, 1);
        assert_eq!(rows[1].season_name, "Summer");
        assert_eq!(rows[1].total_kills, 7);
    }

    #[tokio::test]
    async fn leaderboard_ranks_by_kd_and_skips_zero_deaths() {
        let store = memory_store().await;
        let season = store.create_season("Spring").await.unwrap();
        let mut entries = Vec::new();
        for (discord_id, name, kills, deaths) in [
            (1, "Ace", 10, 2),
            (2, "Untouchable", 5, 0),
            (3, "Brawler", 9, 3),
        ] {
            let id = assigned_id(&store, discord_id).await;
            store.set_ingame_name(discord_id, name).await.unwrap();
            entries.push(MatchEntry {
                player_id: id,
                kills,
                deaths,
                assists: 0,
            });
        }
        store.record_match(season.id, &entries).await.unwrap();

        let rows = store.leaderboard().await.unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.ingame_name.as_str()).collect();
        assert_eq!(names, ["Ace", "Brawler"]);
        assert_eq!(rows[0].total_kills, 10);
        assert_eq!(rows[0].total_deaths, 2);
    }

    #[tokio::test]
    async fn leaderboard_is_empty_without_an_active_season() {
        let store = memory_store().await;
        assert!(store.leaderboard().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_season_cascades_but_spares_players() {
        let store = memory_store().await;
        let season = store.create_season("S1").await.unwrap();
        store.create_team("alpha", season.id).await.unwrap();
        let id = assigned_id(&store, 1).await;
        store.assign_player(&id, "alpha", season.id).await.unwrap();
        store
            .record_match(
                season.id,
                &[MatchEntry {
                    player_id: id.clone(),
                    kills: 1,
                    deaths: 1,
                    assists: 1,
                }],
            )
            .await
            .unwrap();

        assert!(store.delete_season("S1").await.unwrap());
        assert!(!store.delete_season("S1").await.unwrap());

        assert_eq!(count(&store, "SELECT COUNT(*) FROM teams").await, 0);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM team_members").await, 0);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM match_results").await, 0);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM players").await, 1);
        let player = store.find_player(1).await.unwrap().unwrap();
        assert_eq!(player.id, id, "player keeps the id across season deletes");
    }
}
