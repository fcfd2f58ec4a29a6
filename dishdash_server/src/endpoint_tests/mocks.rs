use dishdash_engine::{
    db_types::{NewProfile, Profile},
    traits::{AuthApiError, AuthManagement},
};
use mockall::mock;

mock! {
    pub AuthManager {}
    impl AuthManagement for AuthManager {
        async fn insert_profile(&self, profile: NewProfile) -> Result<Profile, AuthApiError>;
        async fn fetch_profile(&self, user_id: i64) -> Result<Option<Profile>, AuthApiError>;
        async fn fetch_profile_by_email(&self, email: &str) -> Result<Option<Profile>, AuthApiError>;
    }
}
