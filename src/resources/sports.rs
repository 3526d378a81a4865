//! Sports teams: rosters, fixtures and results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{decimal, status_mutation, Crud, Ctx, Nested, Resource, StatusChange, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "sports-teams",
  detail: "sports-team",
  path: "/sports-teams/",
  create: &invalidation::TEAM_CREATE,
  update: &invalidation::TEAM_UPDATE,
  delete: &invalidation::TEAM_DELETE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamLevel {
  Varsity,
  JuniorVarsity,
  Freshman,
  Recreational,
}

impl TeamLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      TeamLevel::Varsity => "varsity",
      TeamLevel::JuniorVarsity => "junior_varsity",
      TeamLevel::Freshman => "freshman",
      TeamLevel::Recreational => "recreational",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
  Fall,
  Winter,
  Spring,
  Summer,
  AllYear,
}

impl Season {
  pub fn as_str(&self) -> &'static str {
    match self {
      Season::Fall => "fall",
      Season::Winter => "winter",
      Season::Spring => "spring",
      Season::Summer => "summer",
      Season::AllYear => "all_year",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportsTeam {
  pub id: u64,
  pub name: String,
  pub sport: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub coach_id: Option<u64>,
  #[serde(default)]
  pub practice_schedule: String,
  #[serde(default)]
  pub practice_location: String,
  #[serde(default)]
  pub max_players: u32,
  #[serde(default)]
  pub current_players: u32,
  pub level: TeamLevel,
  #[serde(default)]
  pub requires_tryout: bool,
  pub season: Season,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamFilters {
  pub sport: Option<String>,
  pub level: Option<TeamLevel>,
  pub season: Option<Season>,
  pub coach_id: Option<u64>,
  pub is_active: Option<bool>,
  pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
  #[default]
  Active,
  Inactive,
  Injured,
  Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPlayer {
  pub id: u64,
  pub team_id: u64,
  pub student_id: u64,
  #[serde(default)]
  pub position: String,
  #[serde(default)]
  pub jersey_number: Option<u32>,
  #[serde(default)]
  pub joined_date: Option<String>,
  #[serde(default)]
  pub status: PlayerStatus,
  #[serde(default)]
  pub is_captain: bool,
  #[serde(default)]
  pub is_vice_captain: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlayer {
  pub student_id: u64,
  pub position: String,
  pub jersey_number: u32,
  #[serde(default)]
  pub is_captain: bool,
  #[serde(default)]
  pub is_vice_captain: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub position: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub jersey_number: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<PlayerStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_captain: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_vice_captain: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
  Home,
  Away,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
  Win,
  Loss,
  Tie,
  #[default]
  Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
  pub id: u64,
  pub team_id: u64,
  pub opponent: String,
  pub game_date: String,
  #[serde(default)]
  pub game_time: Option<String>,
  #[serde(default)]
  pub location: String,
  pub home_away: HomeAway,
  #[serde(default)]
  pub score_team: Option<u32>,
  #[serde(default)]
  pub score_opponent: Option<u32>,
  #[serde(default)]
  pub result: GameResult,
  #[serde(default)]
  pub notes: String,
}

impl Game {
  /// The result implied by the score, when both sides have one.
  pub fn scored_result(&self) -> Option<GameResult> {
    let (us, them) = (self.score_team?, self.score_opponent?);
    Some(match us.cmp(&them) {
      std::cmp::Ordering::Greater => GameResult::Win,
      std::cmp::Ordering::Less => GameResult::Loss,
      std::cmp::Ordering::Equal => GameResult::Tie,
    })
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGame {
  pub opponent: String,
  pub game_date: String,
  pub game_time: String,
  pub location: String,
  pub home_away: HomeAway,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Partial fixture edit; also how a final score is recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub game_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub game_time: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score_team: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score_opponent: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<GameResult>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatistics {
  #[serde(default)]
  pub total_players: u32,
  #[serde(default)]
  pub active_players: u32,
  #[serde(default)]
  pub games_played: u32,
  #[serde(default)]
  pub wins: u32,
  #[serde(default)]
  pub losses: u32,
  #[serde(default)]
  pub ties: u32,
  #[serde(default, deserialize_with = "decimal")]
  pub win_percentage: f64,
  #[serde(default)]
  pub current_streak: String,
}

#[derive(Clone)]
pub struct SportsTeams {
  ctx: Ctx,
  crud: Crud<SportsTeam>,
}

impl SportsTeams {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &TeamFilters) -> Query<Page<SportsTeam>> {
    self.crud.list(&Filters::from_serialize(filters))
  }

  pub fn get(&self, id: u64) -> Query<SportsTeam> {
    self.crud.get(&id)
  }

  pub fn by_sport(&self, sport: &str) -> Query<Page<SportsTeam>> {
    self.ctx.page_with(
      QueryKey::new(RESOURCE.name).with("sport").with(sport),
      format!("{}sport/{}/", RESOURCE.path, sport),
      QueryOptions::default().enabled(!sport.trim().is_empty()),
    )
  }

  pub fn by_level(&self, level: TeamLevel) -> Query<Page<SportsTeam>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name).with("level").with(level.as_str()),
      format!("{}level/{}/", RESOURCE.path, level.as_str()),
    )
  }

  pub fn by_season(&self, season: Season) -> Query<Page<SportsTeam>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name).with("season").with(season.as_str()),
      format!("{}season/{}/", RESOURCE.path, season.as_str()),
    )
  }

  pub fn by_coach(&self, coach: u64) -> Query<Page<SportsTeam>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name).with("coach").with(coach),
      format!("{}coach/{}/", RESOURCE.path, coach),
    )
  }

  pub fn players(&self, team: u64) -> Query<Page<TeamPlayer>> {
    self.ctx.page(
      RESOURCE.detail_key(team).with("players"),
      format!("{}players/", RESOURCE.detail_path(team)),
    )
  }

  pub fn games(&self, team: u64) -> Query<Page<Game>> {
    self.ctx.page(
      RESOURCE.detail_key(team).with("games"),
      format!("{}games/", RESOURCE.detail_path(team)),
    )
  }

  pub fn upcoming_games(&self, team: u64, limit: Option<u32>) -> Query<Page<Game>> {
    let filters = Filters::new().with("limit", limit);
    self.ctx.page(
      RESOURCE
        .detail_key(team)
        .with("upcoming-games")
        .with_filters(&filters),
      filters.apply_to(&format!("{}upcoming-games/", RESOURCE.detail_path(team))),
    )
  }

  pub fn game_results(
    &self,
    team: u64,
    start: Option<&str>,
    end: Option<&str>,
  ) -> Query<Page<Game>> {
    let filters = Filters::new().with("start_date", start).with("end_date", end);
    self.ctx.page(
      RESOURCE
        .detail_key(team)
        .with("game-results")
        .with_filters(&filters),
      filters.apply_to(&format!("{}game-results/", RESOURCE.detail_path(team))),
    )
  }

  pub fn statistics(&self, team: u64) -> Query<TeamStatistics> {
    self.ctx.query(
      RESOURCE.detail_key(team).with("statistics"),
      format!("{}statistics/", RESOURCE.detail_path(team)),
    )
  }

  pub fn create(&self) -> Mutation<Value, SportsTeam> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, SportsTeam> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn update_status(&self) -> Mutation<StatusChange, SportsTeam> {
    status_mutation(&self.ctx, &RESOURCE, &invalidation::TEAM_STATUS)
  }

  pub fn add_player(&self) -> Mutation<Nested<NewPlayer>, TeamPlayer> {
    self.ctx.mutation(
      &invalidation::TEAM_ADD_PLAYER,
      |client, player: Nested<NewPlayer>| async move {
        client
          .post(&format!("{}players/", RESOURCE.detail_path(player.owner)), &player.data)
          .await
      },
    )
  }

  pub fn update_player(&self) -> Mutation<Nested<PlayerUpdate>, TeamPlayer> {
    self.ctx.mutation(
      &invalidation::TEAM_UPDATE_PLAYER,
      |client, change: Nested<PlayerUpdate>| async move {
        let player = change.item_id()?;
        client
          .patch(&nested_path(change.owner, "players", player), &change.data)
          .await
      },
    )
  }

  pub fn remove_player(&self) -> Mutation<Nested, Value> {
    self
      .ctx
      .mutation(&invalidation::TEAM_REMOVE_PLAYER, |client, target: Nested| async move {
        let player = target.item_id()?;
        client.delete(&nested_path(target.owner, "players", player)).await
      })
  }

  pub fn add_game(&self) -> Mutation<Nested<NewGame>, Game> {
    self
      .ctx
      .mutation(&invalidation::TEAM_ADD_GAME, |client, game: Nested<NewGame>| async move {
        client
          .post(&format!("{}games/", RESOURCE.detail_path(game.owner)), &game.data)
          .await
      })
  }

  pub fn update_game(&self) -> Mutation<Nested<GameUpdate>, Game> {
    self.ctx.mutation(
      &invalidation::TEAM_UPDATE_GAME,
      |client, change: Nested<GameUpdate>| async move {
        let game = change.item_id()?;
        client
          .patch(&nested_path(change.owner, "games", game), &change.data)
          .await
      },
    )
  }

  pub fn delete_game(&self) -> Mutation<Nested, Value> {
    self
      .ctx
      .mutation(&invalidation::TEAM_DELETE_GAME, |client, target: Nested| async move {
        let game = target.item_id()?;
        client.delete(&nested_path(target.owner, "games", game)).await
      })
  }
}

fn nested_path(team: u64, collection: &str, item: u64) -> String {
  format!("{}{}/{}/", RESOURCE.detail_path(team), collection, item)
}
