//! Equipment service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingQuery, Rates},
        equipment::{CreateEquipment, Equipment, UpdateEquipment},
    },
    repository::SharedStore,
};

#[derive(Clone)]
pub struct EquipmentService {
    store: SharedStore,
}

impl EquipmentService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        self.store.equipment_list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.store.equipment_get(id).await
    }

    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        Rates {
            daily_rate: data.daily_rate,
            weekly_rate: data.weekly_rate,
            monthly_rate: data.monthly_rate,
        }
        .validate()?;

        let equipment = self.store.equipment_create(data).await?;
        tracing::info!(equipment_id = equipment.id, category = %equipment.category, "Equipment created");
        Ok(equipment)
    }

    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        let mut preview = self.store.equipment_get(id).await?;
        data.apply_to(&mut preview);
        preview.rates().validate()?;

        self.store.equipment_update(id, data).await
    }

    /// Delete equipment that has no open bookings
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let open = self
            .bookings(id)
            .await?
            .into_iter()
            .filter(|b| b.status.is_blocking())
            .count();
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "Equipment {} has {} open booking(s)",
                id, open
            )));
        }
        self.store.equipment_delete(id).await?;
        tracing::info!(equipment_id = id, "Equipment deleted");
        Ok(())
    }

    /// All bookings for the equipment, newest first
    pub async fn bookings(&self, id: i32) -> AppResult<Vec<Booking>> {
        self.store.equipment_get(id).await?;
        self.store
            .booking_list(&BookingQuery {
                equipment_id: Some(id),
                ..Default::default()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::CreateBooking;
    use crate::services::test_support::{date, Fixture};
    use rust_decimal::Decimal;

    fn camera(daily: i64) -> CreateEquipment {
        CreateEquipment {
            name: "RED Komodo".to_string(),
            category: "camera".to_string(),
            daily_rate: Decimal::from(daily),
            weekly_rate: Some(Decimal::from(daily * 5)),
            monthly_rate: None,
            serial_number: Some("KMD-0042".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_validates() {
        let fx = Fixture::new().await;
        let service = &fx.services.equipment;

        assert!(matches!(service.create(&camera(-1)).await, Err(AppError::Validation(_))));
        let mut unnamed = camera(10);
        unnamed.name = String::new();
        assert!(matches!(service.create(&unnamed).await, Err(AppError::Validation(_))));

        let created = service.create(&camera(10)).await.unwrap();
        assert_eq!(service.get_by_id(created.id).await.unwrap().name, "RED Komodo");
    }

    #[tokio::test]
    async fn test_update_rejects_negative_rate() {
        let fx = Fixture::new().await;
        let update = UpdateEquipment {
            monthly_rate: Some(Decimal::from(-100)),
            ..Default::default()
        };
        assert!(matches!(
            fx.services.equipment.update(fx.camera, &update).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_refuses_open_bookings() {
        let fx = Fixture::new().await;
        fx.services
            .bookings
            .create_booking(
                fx.customer,
                CreateBooking {
                    equipment_id: fx.lens,
                    user_id: None,
                    start_date: date("2024-05-01"),
                    end_date: date("2024-05-03"),
                    rates: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            fx.services.equipment.delete(fx.lens).await,
            Err(AppError::Conflict(_))
        ));
        fx.services.equipment.delete(fx.camera).await.unwrap();
        assert!(matches!(
            fx.services.equipment.get_by_id(fx.camera).await,
            Err(AppError::NotFound(_))
        ));
    }
}
