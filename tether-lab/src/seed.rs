//! Sample rows: two companies in one country, two positions, four users.

use tether_query::{QueryResult, Session};
use tracing::info;

use crate::models::{City, Company, Country, Position, User};

/// Rows inserted by [`seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub positions: usize,
    pub cities: usize,
    pub countries: usize,
    pub companies: usize,
    pub users: usize,
}

impl SeedReport {
    /// Total number of rows.
    pub fn total(&self) -> usize {
        self.positions + self.cities + self.countries + self.companies + self.users
    }
}

/// Insert the sample data through `session`.
///
/// Users are inserted as Tom, Bob, Alice, Kate, so collections ordered by
/// identity read Microsoft: Tom, Alice and Google: Bob, Kate.
pub async fn seed(session: &Session) -> QueryResult<SeedReport> {
    let mut manager = Position::new("Manager");
    let mut developer = Position::new("Developer");
    session.add(&mut manager).await?;
    session.add(&mut developer).await?;

    let mut washington = City::new("Washington");
    session.add(&mut washington).await?;

    let mut usa = Country::new("USA", &washington);
    session.add(&mut usa).await?;

    let mut microsoft = Company::new("Microsoft", Some(&usa));
    let mut google = Company::new("Google", Some(&usa));
    session.add(&mut microsoft).await?;
    session.add(&mut google).await?;

    let mut users = [
        User::new("Tom", Some(&microsoft), Some(&manager)),
        User::new("Bob", Some(&google), Some(&developer)),
        User::new("Alice", Some(&microsoft), Some(&developer)),
        User::new("Kate", Some(&google), Some(&manager)),
    ];
    for user in &mut users {
        session.add(user).await?;
    }

    let report = SeedReport {
        positions: 2,
        cities: 1,
        countries: 1,
        companies: 2,
        users: users.len(),
    };
    info!(rows = report.total(), "Seeded sample data");
    Ok(report)
}
