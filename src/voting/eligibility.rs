use log::{info, warn};
use rocket::{
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request,
};

use crate::error::{Error, Result};
use crate::model::{
    common::{ElectionId, UserId},
    db::{election::Election, user::User},
};
use crate::store::StoreHandle;

use super::managed_state;

/// Decides who may vote in which election, and maintains closed rolls.
///
/// An election with an empty roll is open to every voter. Once anyone is on
/// the roll, only those listed may vote.
#[derive(Clone)]
pub struct EligibilityOracle {
    store: StoreHandle,
}

impl EligibilityOracle {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    async fn election(&self, election_id: ElectionId) -> Result<Election> {
        self.store
            .election(election_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
    }

    /// May the user vote in the election? Fails if the election does not exist.
    pub async fn is_eligible(&self, election_id: ElectionId, user_id: UserId) -> Result<bool> {
        Ok(self.election(election_id).await?.admits(user_id))
    }

    /// Put a user on an election's roll. Adding someone already listed is a no-op.
    pub async fn add_eligible_voter(&self, election_id: ElectionId, user_id: UserId) -> Result<()> {
        if self.store.user(user_id).await?.is_none() {
            return Err(Error::not_found(format!("User {user_id}")));
        }
        if !self.store.add_eligible_voter(election_id, user_id).await? {
            return Err(Error::not_found(format!("Election {election_id}")));
        }
        info!("User {user_id} is on the roll for election {election_id}");
        Ok(())
    }

    /// Take a user off an election's roll. Removing someone not listed is a no-op.
    pub async fn remove_eligible_voter(
        &self,
        election_id: ElectionId,
        user_id: UserId,
    ) -> Result<()> {
        if !self
            .store
            .remove_eligible_voter(election_id, user_id)
            .await?
        {
            return Err(Error::not_found(format!("Election {election_id}")));
        }
        info!("User {user_id} is off the roll for election {election_id}");
        Ok(())
    }

    /// The users on an election's roll, in the order they were added.
    pub async fn list_eligible_voters(&self, election_id: ElectionId) -> Result<Vec<User>> {
        let election = self.election(election_id).await?;
        let mut voters = Vec::with_capacity(election.eligible_voters.len());
        for &user_id in &election.eligible_voters {
            match self.store.user(user_id).await? {
                Some(user) => voters.push(user),
                None => warn!("Election {election_id} lists unknown user {user_id}"),
            }
        }
        Ok(voters)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for EligibilityOracle {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let (store, _) = try_outcome!(managed_state(req));
        Outcome::Success(Self::new(store))
    }
}

#[cfg(test)]
mod tests {
    use crate::voting::testing::{example_election, ids, store, voters};

    use super::*;

    #[rocket::async_test]
    async fn open_roll_admits_everyone() {
        let store = store();
        let oracle = EligibilityOracle::new(store.clone());
        let id = example_election(&store).await.election.id;

        for user_id in [1, 2, 1000] {
            assert!(oracle.is_eligible(id, user_id).await.unwrap());
        }
        assert!(oracle.list_eligible_voters(id).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn closed_roll_admits_only_listed() {
        let store = store();
        let oracle = EligibilityOracle::new(store.clone());
        let id = example_election(&store).await.election.id;
        let users = voters(&store, 3).await;
        let (u1, u2, u3) = (users[0].id, users[1].id, users[2].id);

        oracle.add_eligible_voter(id, u1).await.unwrap();
        oracle.add_eligible_voter(id, u2).await.unwrap();
        oracle.add_eligible_voter(id, u2).await.unwrap();

        assert!(oracle.is_eligible(id, u1).await.unwrap());
        assert!(oracle.is_eligible(id, u2).await.unwrap());
        assert!(!oracle.is_eligible(id, u3).await.unwrap());
        assert_eq!(
            ids(&oracle.list_eligible_voters(id).await.unwrap()),
            vec![u1, u2]
        );

        // Removing is idempotent, and emptying the roll opens the election.
        oracle.remove_eligible_voter(id, u1).await.unwrap();
        oracle.remove_eligible_voter(id, u1).await.unwrap();
        assert!(!oracle.is_eligible(id, u1).await.unwrap());
        oracle.remove_eligible_voter(id, u2).await.unwrap();
        assert!(oracle.is_eligible(id, u3).await.unwrap());
    }

    #[rocket::async_test]
    async fn missing_entities() {
        let store = store();
        let oracle = EligibilityOracle::new(store.clone());
        let id = example_election(&store).await.election.id;
        let user = voters(&store, 1).await.remove(0);

        assert!(matches!(
            oracle.is_eligible(id + 1, user.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            oracle.add_eligible_voter(id + 1, user.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            oracle.add_eligible_voter(id, user.id + 1).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            oracle.remove_eligible_voter(id + 1, user.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            oracle.list_eligible_voters(id + 1).await,
            Err(Error::NotFound(_))
        ));
    }
}
