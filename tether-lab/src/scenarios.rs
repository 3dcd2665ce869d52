//! The three loading demonstrations.
//!
//! Each scenario opens fresh sessions and returns the lines it would print,
//! so tests can compare output without capturing stdout.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tether_query::Filter;
use tracing::{debug, instrument};

use crate::Lab;
use crate::error::{LabError, LabResult};
use crate::models::{Company, User};

/// Printed between users in the eager scenario.
pub const SEPARATOR: &str = "----------------------";

/// A loading demonstration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Users with company, country, capital, and position in one fetch.
    Eager,
    /// Relations fetched on first access, then access after release.
    Lazy,
    /// Relations fetched on request through session entries.
    Explicit,
}

impl Scenario {
    /// Every scenario, in the order the lab runs them.
    pub const ALL: [Scenario; 3] = [Self::Eager, Self::Lazy, Self::Explicit];

    /// Name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Lazy => "lazy",
            Self::Explicit => "explicit",
        }
    }

    /// Heading printed above the output.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Eager => "Eager loading (include / then_include)",
            Self::Lazy => "Lazy loading",
            Self::Explicit => "Explicit loading (entry)",
        }
    }

    /// Run the scenario against a seeded lab.
    pub async fn run(self, lab: &Lab) -> LabResult<Vec<String>> {
        match self {
            Self::Eager => eager(lab).await,
            Self::Lazy => lazy(lab).await,
            Self::Explicit => explicit(lab).await,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                LabError::Config(format!(
                    "unknown scenario '{}' (expected one of: eager, lazy, explicit)",
                    s
                ))
            })
    }
}

fn name_of<M>(entity: Option<&Arc<M>>, name: impl Fn(&M) -> &str) -> String {
    entity.map(|e| name(e).to_string()).unwrap_or_default()
}

/// Users with `company.country.capital` and `position`, fetched together.
#[instrument(skip(lab))]
pub async fn eager(lab: &Lab) -> LabResult<Vec<String>> {
    let session = lab.sessions().open();
    let users = session
        .query::<User>()
        .include("company")
        .then_include("country")
        .then_include("capital")
        .include("position")
        .all()
        .await?;

    let mut lines = Vec::with_capacity(users.len() * 3);
    for user in &users {
        let position = user.position.get();
        let company = user.company.get();
        let country = company.as_ref().and_then(|c| c.country.get());
        let capital = country.as_ref().and_then(|c| c.capital.get());

        lines.push(format!(
            "{} - {}",
            user.name,
            name_of(position.as_ref(), |p| p.name.as_str())
        ));
        lines.push(format!(
            "{} - {} - {}",
            name_of(company.as_ref(), |c| c.name.as_str()),
            name_of(country.as_ref(), |c| c.name.as_str()),
            name_of(capital.as_ref(), |c| c.name.as_str())
        ));
        lines.push(SEPARATOR.to_string());
    }

    debug!(fetches = session.fetch_count(), "Eager scenario done");
    Ok(lines)
}

/// Users with their company, companies with their users, both fetched on
/// first access; then the same access after the session is gone.
#[instrument(skip(lab))]
pub async fn lazy(lab: &Lab) -> LabResult<Vec<String>> {
    let mut lines = Vec::new();

    let session = lab.lazy_sessions().open();
    for user in session.query::<User>().all().await? {
        let company = user.company.load().await?;
        lines.push(format!(
            "{} - {}",
            user.name,
            name_of(company.as_ref(), |c| c.name.as_str())
        ));
    }
    debug!(fetches = session.fetch_count(), "Users with companies");
    session.close();

    let session = lab.lazy_sessions().open();
    for company in session.query::<Company>().all().await? {
        let mut line = format!("{}: ", company.name);
        for user in company.users.load().await? {
            line.push_str(&user.name);
            line.push(' ');
        }
        lines.push(line);
    }
    debug!(fetches = session.fetch_count(), "Companies with users");
    session.close();

    let session = lab.lazy_sessions().open();
    let first = session.query::<User>().first().await?;
    session.close();

    if let Some(user) = first {
        match user.company.load().await {
            Err(err) if err.is_invalid_operation() => {
                lines.push(format!("{} after release: {}", user.name, err.message));
            }
            Err(err) => return Err(err.into()),
            Ok(_) => {
                return Err(LabError::scenario(
                    "lazy",
                    "relation loaded after its session was released",
                ));
            }
        }
    }

    Ok(lines)
}

/// Collections and references loaded through `session.entry(..)`.
#[instrument(skip(lab))]
pub async fn explicit(lab: &Lab) -> LabResult<Vec<String>> {
    let factory = lab.sessions();
    let mut lines = Vec::new();

    // Users keyed by the first company's identity, loaded into its slot.
    {
        let session = factory.open();
        if let Some(company) = session.query::<Company>().first().await? {
            session
                .entry(&company)
                .collection("users")?
                .load_where(Filter::None)
                .await?;
            lines.push(format!("Company: {}", company.name));
            lines.extend(company.users.get().iter().map(|u| format!(":User  {}", u.name)));
        }
    }

    // The same collection, loaded into the slot.
    {
        let session = factory.open();
        if let Some(company) = session.query::<Company>().first().await? {
            session.entry(&company).collection("users")?.load().await?;
            lines.push(format!("Company: {}", company.name));
            lines.extend(company.users.get().iter().map(|u| format!(":User  {}", u.name)));
        }
    }

    {
        let session = factory.open();
        if let Some(user) = session.query::<User>().first().await? {
            session.entry(&user).reference("company")?.load().await?;
            let company = user.company.get();
            lines.push(format!(
                "{} - {}",
                user.name,
                name_of(company.as_ref(), |c| c.name.as_str())
            ));
        }
    }

    // Companies by identity, then every user.
    {
        let session = factory.open();
        if let Some(first) = session.find::<Company>(1).await? {
            session
                .entry(&first)
                .collection("users")?
                .load_where(Filter::None)
                .await?;
            lines.extend(first.users.get().iter().map(|u| format!(":User  {}", u.name)));

            if let Some(second) = session.find::<Company>(2).await? {
                session.entry(&second).collection("users")?.load().await?;
                lines.extend(second.users.get().iter().map(|u| format!(":User   {}", u.name)));
            }

            let everyone = session.query::<User>().all().await?;
            lines.extend(everyone.iter().map(|u| format!(":User   {}", u.name)));
        }
    }

    Ok(lines)
}
