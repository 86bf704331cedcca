//! Business logic services

pub mod auth;
pub mod bookings;
pub mod equipment;
pub mod locks;
pub mod predictions;
pub mod stats;

use std::sync::Arc;

use crate::{
    config::{AuthConfig, PredictionsConfig},
    repository::SharedStore,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub equipment: equipment::EquipmentService,
    pub bookings: bookings::BookingsService,
    pub predictions: predictions::PredictionService,
    pub stats: stats::StatsService,
    pub store: SharedStore,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(store: SharedStore, auth_config: AuthConfig, predictions: PredictionsConfig) -> Self {
        let locks = locks::EquipmentLocks::new();
        Self {
            auth: auth::AuthService::new(store.clone(), auth_config),
            equipment: equipment::EquipmentService::new(store.clone()),
            bookings: bookings::BookingsService::new(store.clone(), locks),
            predictions: predictions::PredictionService::new(store.clone(), Arc::new(predictions)),
            stats: stats::StatsService::new(store.clone()),
            store,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::Services;
    use crate::{
        config::{AuthConfig, PredictionsConfig},
        models::{
            equipment::{CreateEquipment, EquipmentStatus, UpdateEquipment},
            user::{NewUser, UserRole},
        },
        repository::{MemoryStore, Store},
    };

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Memory-backed services with one customer, one staff member, a camera
    /// (100/day) and a lens (40/day)
    pub struct Fixture {
        pub store: Arc<MemoryStore>,
        pub services: Services,
        pub customer: i32,
        pub staff: i32,
        pub camera: i32,
        pub lens: i32,
    }

    impl Fixture {
        pub async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let services = Services::new(store.clone(), AuthConfig::default(), PredictionsConfig::default());

            let customer = add_user(&store, "director", UserRole::Customer).await;
            let staff = add_user(&store, "rental-desk", UserRole::Staff).await;
            let camera = add_equipment(&store, "ARRI Alexa Mini", "camera", 100).await;
            let lens = add_equipment(&store, "Cooke S4 32mm", "lens", 40).await;

            Self { store, services, customer, staff, camera, lens }
        }

        pub async fn equipment_status(&self, id: i32) -> EquipmentStatus {
            self.store.equipment_get(id).await.unwrap().status
        }

        pub async fn set_equipment_status(&self, id: i32, status: EquipmentStatus) {
            let update = UpdateEquipment {
                status: Some(status),
                ..Default::default()
            };
            self.store.equipment_update(id, &update).await.unwrap();
        }
    }

    pub async fn add_user(store: &MemoryStore, login: &str, role: UserRole) -> i32 {
        store
            .user_create(&NewUser {
                login: login.to_string(),
                password_hash: String::new(),
                firstname: None,
                lastname: None,
                email: None,
                role,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn add_equipment(store: &MemoryStore, name: &str, category: &str, daily: i64) -> i32 {
        store
            .equipment_create(&CreateEquipment {
                name: name.to_string(),
                category: category.to_string(),
                daily_rate: Decimal::from(daily),
                weekly_rate: None,
                monthly_rate: None,
                serial_number: None,
                notes: None,
            })
            .await
            .unwrap()
            .id
    }
}
