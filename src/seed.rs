//! Initial data for a fresh store.
//!
//! Every function here is idempotent, so it is safe to run on each launch.

use log::{debug, info};

use crate::error::Result;
use crate::model::{
    common::{ElectionStatus, Role},
    db::{candidate::NewCandidate, election::NewElection, user::NewUser},
};
use crate::store::StoreHandle;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEMO_VOTER_COUNT: u32 = 20;
pub const DEMO_ELECTION_TITLE: &str = "Student Council President 2026";

/// Ensure that some admin user exists, creating the default one if not.
pub async fn ensure_admin_exists(store: &StoreHandle) -> Result<()> {
    let users = store.users().await?;
    if let Some(admin) = users.iter().find(|user| user.role == Role::Admin) {
        debug!("Admin '{}' already exists", admin.username);
        return Ok(());
    }
    let admin = NewUser {
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        role: Role::Admin,
        user_type: Some("Staff".to_string()),
    };
    let admin = store.insert_user(admin).await?;
    info!("Created default admin with ID {}", admin.id);
    Ok(())
}

/// Populate the store with sample voters and an open election.
///
/// Voters are only added if there are none yet, and the election only if no
/// election with the same title exists.
pub async fn seed_demo_data(store: &StoreHandle) -> Result<()> {
    let users = store.users().await?;
    if users.iter().any(|user| user.role == Role::Voter) {
        debug!("Voters already exist, not seeding any");
    } else {
        for n in 1..=DEMO_VOTER_COUNT {
            let voter = NewUser {
                username: format!("std{n:03}"),
                role: Role::Voter,
                user_type: Some("Student".to_string()),
            };
            store.insert_user(voter).await?;
        }
        info!("Seeded {DEMO_VOTER_COUNT} demo voters");
    }

    let elections = store.elections().await?;
    if elections
        .iter()
        .any(|election| election.title == DEMO_ELECTION_TITLE)
    {
        debug!("Demo election already exists");
        return Ok(());
    }
    let candidates = ["Polaris Brightheart", "Clara Kindcheek"]
        .into_iter()
        .map(|name| NewCandidate {
            election_id: 0,
            name: name.to_string(),
            policy: None,
            image: None,
        })
        .collect();
    let election = NewElection::new(
        DEMO_ELECTION_TITLE.to_string(),
        ElectionStatus::Ongoing,
        None,
        None,
    );
    let (election, _) = store.insert_election(election, candidates).await?;
    info!("Seeded demo election {}", election.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;

    use super::*;

    #[rocket::async_test]
    async fn seeding_is_idempotent() {
        let store = StoreHandle::new(MemoryStore::new());
        for _ in 0..2 {
            ensure_admin_exists(&store).await.unwrap();
            seed_demo_data(&store).await.unwrap();
        }

        let users = store.users().await.unwrap();
        assert_eq!(users.len(), 1 + DEMO_VOTER_COUNT as usize);
        assert_eq!(users[0].username, DEFAULT_ADMIN_USERNAME);
        assert_eq!(users[0].role, Role::Admin);
        assert_eq!(users[1].username, "std001");
        assert_eq!(users[20].username, "std020");

        let elections = store.elections().await.unwrap();
        assert_eq!(elections.len(), 1);
        assert_eq!(elections[0].status, ElectionStatus::Ongoing);
        let candidates = store
            .candidates_for_election(elections[0].id)
            .await
            .unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[rocket::async_test]
    async fn any_admin_satisfies_seeding() {
        let store = StoreHandle::new(MemoryStore::new());
        let coordinator = NewUser {
            username: "coordinator".to_string(),
            role: Role::Admin,
            user_type: None,
        };
        store.insert_user(coordinator).await.unwrap();

        ensure_admin_exists(&store).await.unwrap();

        let users = store.users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "coordinator");
        assert_eq!(
            store.user_by_username(DEFAULT_ADMIN_USERNAME).await.unwrap(),
            None
        );
    }

    #[rocket::async_test]
    async fn voters_do_not_count_as_admins() {
        let store = StoreHandle::new(MemoryStore::new());
        store.insert_user(NewUser::example_voter(1)).await.unwrap();

        ensure_admin_exists(&store).await.unwrap();

        let admin = store
            .user_by_username(DEFAULT_ADMIN_USERNAME)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
