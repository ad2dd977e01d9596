//! Favorite cities, kept per account when signed in and on the device otherwise.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, SignedIn, TableClient};
use crate::store::{FAVORITES_KEY, LocalStore};

pub const FAVORITES_TABLE: &str = "user_favorites";

/// Ordered city names. Membership checks keep it free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites(Vec<String>);

impl Favorites {
    pub fn new(cities: Vec<String>) -> Self {
        Self(cities)
    }

    pub fn contains(&self, city: &str) -> bool {
        self.0.iter().any(|c| c == city)
    }

    /// Returns `false` when the city was already there.
    pub fn add(&mut self, city: &str) -> Result<bool> {
        let city = city.trim();
        if city.is_empty() {
            return Err(anyhow!("City name must not be empty"));
        }
        if self.contains(city) {
            return Ok(false);
        }
        self.0.push(city.to_string());
        Ok(true)
    }

    /// Returns `false` when the city was not there.
    pub fn remove(&mut self, city: &str) -> bool {
        let city = city.trim();
        let before = self.0.len();
        self.0.retain(|c| c != city);
        self.0.len() != before
    }

    /// Adds or removes; returns whether the city is now a favorite.
    pub fn toggle(&mut self, city: &str) -> Result<bool> {
        if self.remove(city) {
            Ok(false)
        } else {
            self.add(city)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct FavoriteRow {
    city_name: String,
}

#[derive(Debug, Serialize)]
struct NewFavoriteRow<'a> {
    user_id: &'a str,
    city_name: &'a str,
}

/// Loads and saves favorites, falling back to the device when the backend fails.
#[derive(Debug, Clone)]
pub struct FavoritesRepository {
    store: LocalStore,
    remote: Option<TableClient>,
}

impl FavoritesRepository {
    pub fn new(store: LocalStore, remote: Option<TableClient>) -> Self {
        Self { store, remote }
    }

    fn load_local(&self) -> Result<Favorites> {
        Ok(self
            .store
            .get_json::<Favorites>(FAVORITES_KEY)?
            .unwrap_or_default())
    }

    fn save_local(&self, favorites: &Favorites) -> Result<()> {
        self.store.set_json(FAVORITES_KEY, favorites)
    }

    async fn load_remote(&self, table: &TableClient, user: &SignedIn) -> Result<Favorites, BackendError> {
        let rows: Vec<FavoriteRow> = table
            .select(
                &user.access_token,
                "city_name",
                &[("user_id", user.user.id.as_str())],
                Some("created_at.desc"),
            )
            .await?;

        Ok(Favorites::new(rows.into_iter().map(|r| r.city_name).collect()))
    }

    /// Replaces the user's rows wholesale.
    async fn save_remote(
        &self,
        table: &TableClient,
        user: &SignedIn,
        favorites: &Favorites,
    ) -> Result<(), BackendError> {
        table
            .delete(&user.access_token, &[("user_id", user.user.id.as_str())])
            .await?;

        if !favorites.is_empty() {
            let rows: Vec<NewFavoriteRow<'_>> = favorites
                .iter()
                .map(|city_name| NewFavoriteRow { user_id: &user.user.id, city_name })
                .collect();
            table.insert(&user.access_token, &rows).await?;
        }
        Ok(())
    }

    pub async fn load(&self, user: Option<&SignedIn>) -> Result<Favorites> {
        if let (Some(table), Some(user)) = (&self.remote, user) {
            match self.load_remote(table, user).await {
                Ok(favorites) => return Ok(favorites),
                Err(err) => tracing::warn!("loading favorites from backend failed, using device copy: {err}"),
            }
        }
        self.load_local()
    }

    pub async fn save(&self, user: Option<&SignedIn>, favorites: &Favorites) -> Result<()> {
        if let (Some(table), Some(user)) = (&self.remote, user) {
            match self.save_remote(table, user, favorites).await {
                Ok(()) => return Ok(()),
                Err(err) => tracing::warn!("saving favorites to backend failed, keeping device copy: {err}"),
            }
        }
        self.save_local(favorites)
    }

    /// Returns the updated list and whether anything changed.
    pub async fn add_city(&self, user: Option<&SignedIn>, city: &str) -> Result<(Favorites, bool)> {
        let mut favorites = self.load(user).await?;
        let changed = favorites.add(city)?;
        if changed {
            self.save(user, &favorites).await?;
        }
        Ok((favorites, changed))
    }

    /// Returns the updated list and whether anything changed.
    pub async fn remove_city(&self, user: Option<&SignedIn>, city: &str) -> Result<(Favorites, bool)> {
        let mut favorites = self.load(user).await?;
        let changed = favorites.remove(city);
        if changed {
            self.save(user, &favorites).await?;
        }
        Ok((favorites, changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn favs(cities: &[&str]) -> Favorites {
        Favorites::new(cities.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn add_is_idempotent() {
        let mut f = favs(&["Paris"]);
        assert!(f.add("Oslo").unwrap());
        assert!(!f.add("Oslo").unwrap());
        assert!(!f.add(" Paris ").unwrap());
        assert_eq!(f, favs(&["Paris", "Oslo"]));
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut f = favs(&["Paris"]);
        assert!(!f.remove("Berlin"));
        assert_eq!(f, favs(&["Paris"]));
        assert!(f.remove("Paris"));
        assert!(f.is_empty());
    }

    #[test]
    fn blank_city_rejected() {
        let mut f = Favorites::default();
        assert!(f.add("   ").is_err());
        assert!(f.is_empty());
    }

    #[test]
    fn toggle_flips_membership() {
        let mut f = Favorites::default();
        assert!(f.toggle("Rome").unwrap());
        assert!(f.contains("Rome"));
        assert!(!f.toggle("Rome").unwrap());
        assert!(!f.contains("Rome"));
    }

    #[test]
    fn serializes_as_plain_list() {
        let f = favs(&["Paris", "Oslo"]);
        assert_eq!(serde_json::to_string(&f).unwrap(), r#"["Paris","Oslo"]"#);
    }

    #[tokio::test]
    async fn signed_out_uses_device_storage() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FavoritesRepository::new(LocalStore::open(dir.path()), None);

        assert!(repo.load(None).await.unwrap().is_empty());

        let (f, changed) = repo.add_city(None, "Lisbon").await.unwrap();
        assert!(changed);
        assert_eq!(f, favs(&["Lisbon"]));

        let (_, changed) = repo.add_city(None, "Lisbon").await.unwrap();
        assert!(!changed);

        let (f, changed) = repo.remove_city(None, "Madrid").await.unwrap();
        assert!(!changed);
        assert_eq!(f, favs(&["Lisbon"]));

        assert_eq!(repo.load(None).await.unwrap(), favs(&["Lisbon"]));
    }
}
