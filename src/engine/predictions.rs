//! Forthcoming-week prediction overlay

use chrono::NaiveDate;
use futures::future::try_join_all;

use crate::calendar::prediction_slots;
use crate::config::TenantConfig;
use crate::engine::AggregationEngine;
use crate::engine::response::{PredictionSlot, SubregionPrediction};
use crate::error::{Error, Result};
use crate::models::{Prediction, Region};
use crate::store::PredictionStore;

impl<S: PredictionStore> AggregationEngine<S> {
    /// Predictions for the four weeks following the week containing `end`
    ///
    /// Each slot holds the region's own prediction and one entry per child
    /// region, in child order. Children are looked up by id, whatever
    /// parent their prediction rows record. Missing predictions stay `None`.
    pub async fn prediction_overlay(
        &self,
        tenant: &TenantConfig,
        region: &Region,
        end: NaiveDate,
    ) -> Result<Vec<PredictionSlot>> {
        let children = self.hierarchy.children_of(&region.region_id);
        let slots = prediction_slots(end, tenant.week_start);

        try_join_all(slots.into_iter().map(|date| {
            let children = &children;
            async move {
                let (own, subregions) = futures::try_join!(
                    self.store.current_prediction(&region.region_id, date),
                    try_join_all(children.iter().map(|child| async move {
                        let current = self.store.current_prediction(&child.region_id, date).await?;
                        Ok::<_, Error>(SubregionPrediction {
                            region_id: child.region_id.clone(),
                            name: child.name.clone(),
                            score: current.as_ref().map(Prediction::score),
                        })
                    })),
                )?;

                Ok::<_, Error>(PredictionSlot {
                    date,
                    prediction: own.as_ref().map(Prediction::score),
                    subregions,
                })
            }
        }))
        .await
    }
}
