//! One handle over the client, cache and session, with accessors for every
//! resource binding.

use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::{ApiClient, ReqwestTransport};
use crate::config::{Config, TokenStoreKind};
use crate::query::QueryCache;
use crate::resources::accounts::Accounts;
use crate::resources::activities::Activities;
use crate::resources::assessments::Assessments;
use crate::resources::attendance::Attendance;
use crate::resources::classes::{Classes, Schedules};
use crate::resources::clubs::Clubs;
use crate::resources::diary::Diary;
use crate::resources::employees::Employees;
use crate::resources::events::Events;
use crate::resources::exams::Exams;
use crate::resources::finance::Finance;
use crate::resources::parents::Parents;
use crate::resources::payments::Payments;
use crate::resources::salaries::Salaries;
use crate::resources::school::{Departments, Levels, Sections};
use crate::resources::sports::SportsTeams;
use crate::resources::students::Students;
use crate::resources::subjects::{Curriculum, Subjects};
use crate::resources::teachers::Teachers;
use crate::resources::{self, Ctx};
use crate::session::{MemoryTokenStore, Session, SqliteTokenStore, TokenStore};

#[derive(Clone)]
pub struct Portal {
  ctx: Ctx,
  session: Session,
}

impl Portal {
  /// Build everything from configuration: a reqwest transport, the
  /// configured token store, a fresh cache and a session over both.
  pub fn new(config: &Config) -> Result<Self> {
    let transport = Arc::new(ReqwestTransport::new(config.api.request_timeout())?);
    let tokens = token_store(config)?;
    let client = ApiClient::new(&config.api.base_url, transport, tokens)?;
    let cache = QueryCache::new(config.cache.settings());

    info!(base_url = %client.base_url(), "Portal client ready");
    Ok(Self::with_parts(client, cache, &config.session.login_path))
  }

  /// Assemble a portal from prebuilt parts. Inside a Tokio runtime the
  /// session starts listening for rejected credentials right away.
  pub fn with_parts(client: ApiClient, cache: QueryCache, login_path: &str) -> Self {
    let session = Session::new(client.clone(), cache.clone(), login_path);
    if Handle::try_current().is_ok() {
      session.listen();
    } else {
      debug!("No runtime yet; call session().listen() once one is running");
    }
    Self {
      ctx: Ctx::new(client, cache),
      session,
    }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn client(&self) -> &ApiClient {
    self.ctx.client()
  }

  pub fn cache(&self) -> &QueryCache {
    self.ctx.cache()
  }

  /// Evict unobserved entries every `every` until the handle is aborted.
  pub fn spawn_gc(&self, every: Duration) -> JoinHandle<()> {
    let cache = self.cache().clone();
    tokio::spawn(async move {
      let mut ticks = tokio::time::interval(every);
      ticks.tick().await;
      loop {
        ticks.tick().await;
        let evicted = cache.collect_garbage();
        if evicted > 0 {
          debug!(evicted, "Collected idle cache entries");
        }
      }
    })
  }

  pub fn students(&self) -> Students {
    Students::new(self.ctx.clone(), &resources::students::RESOURCE)
  }

  pub fn parents(&self) -> Parents {
    Parents::new(self.ctx.clone())
  }

  pub fn payments(&self) -> Payments {
    Payments::new(self.ctx.clone())
  }

  pub fn salaries(&self) -> Salaries {
    Salaries::new(self.ctx.clone())
  }

  pub fn attendance(&self) -> Attendance {
    Attendance::new(self.ctx.clone())
  }

  pub fn exams(&self) -> Exams {
    Exams::new(self.ctx.clone())
  }

  pub fn departments(&self) -> Departments {
    Departments::new(self.ctx.clone(), &resources::school::DEPARTMENTS)
  }

  pub fn levels(&self) -> Levels {
    Levels::new(self.ctx.clone(), &resources::school::LEVELS)
  }

  pub fn sections(&self) -> Sections {
    Sections::new(self.ctx.clone(), &resources::school::SECTIONS)
  }

  pub fn subjects(&self) -> Subjects {
    Subjects::new(self.ctx.clone(), &resources::subjects::RESOURCE)
  }

  pub fn curriculum(&self) -> Curriculum {
    Curriculum::new(self.ctx.clone())
  }

  pub fn classes(&self) -> Classes {
    Classes::new(self.ctx.clone(), &resources::classes::RESOURCE)
  }

  pub fn schedules(&self) -> Schedules {
    Schedules::new(self.ctx.clone())
  }

  pub fn teachers(&self) -> Teachers {
    Teachers::new(self.ctx.clone())
  }

  pub fn employees(&self) -> Employees {
    Employees::new(self.ctx.clone())
  }

  pub fn diary(&self) -> Diary {
    Diary::new(self.ctx.clone())
  }

  pub fn accounts(&self) -> Accounts {
    Accounts::new(self.ctx.clone())
  }

  pub fn assessments(&self) -> Assessments {
    Assessments::new(self.ctx.clone())
  }

  pub fn finance(&self) -> Finance {
    Finance::new(self.ctx.clone())
  }

  pub fn events(&self) -> Events {
    Events::new(self.ctx.clone())
  }

  pub fn clubs(&self) -> Clubs {
    Clubs::new(self.ctx.clone())
  }

  pub fn sports_teams(&self) -> SportsTeams {
    SportsTeams::new(self.ctx.clone())
  }

  pub fn activities(&self) -> Activities {
    Activities::new(self.ctx.clone())
  }
}

fn token_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
  Ok(match config.session.token_store {
    TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
    TokenStoreKind::Sqlite => {
      let store = match &config.session.token_db {
        Some(path) => SqliteTokenStore::open(path)?,
        None => SqliteTokenStore::open_default()?,
      };
      Arc::new(store)
    }
  })
}
