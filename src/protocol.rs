use anyhow::Context;
use serde::Serialize;

use crate::flow::booking::BookingFlow;

#[derive(Default, Serialize)]
pub struct SimpleResponse {
    pub success: bool,
    pub err: String,
}

impl SimpleResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            err: "".to_string(),
        }
    }
}

/// Every flow endpoint reports which step (1-4) the session is on afterwards,
/// along with a snapshot of that step.
#[derive(Default, Serialize)]
pub struct StepResponse {
    pub success: bool,
    pub err: String,
    pub step: u8,
    pub step_name: String,
    pub view: serde_json::Value,
}

impl StepResponse {
    pub fn of(flow: &BookingFlow) -> anyhow::Result<Self> {
        let step = flow.step();
        Ok(Self {
            success: true,
            err: "".to_string(),
            step: step.number(),
            step_name: format!("{:?}", step),
            view: serde_json::to_value(flow.view()).context("Failed to encode the flow")?,
        })
    }
}

#[macro_export]
macro_rules! impl_err_response {
    ( $( $type:ty),+ $(,)? ) => {
        $(
            impl $type {
                pub fn err<S: ToString>(err: S) -> Self {
                    Self {
                        success: false,
                        err: err.to_string(),
                        ..Default::default()
                    }
                }
            }
        )+
    };
}

impl_err_response! {
    SimpleResponse,
    StepResponse,
}
