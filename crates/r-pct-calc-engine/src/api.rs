//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
use crate::model::TransformerRating;

#[cfg(feature = "rest-api")]
pub use rest::router;

#[cfg(feature = "rest-api")]
mod rest {
    use axum::{http::StatusCode, routing::post, Json, Router};

    use crate::{
        errors::CalcEngineError,
        fault_levels::FaultLevels,
        grading::{run_grading, GradingReport},
        model::{GradingStudy, TccStudy},
        tcc::{run_tcc, TccReport},
    };

    use super::FaultLevelsRequest;

    pub fn router() -> Router {
        Router::new()
            .route("/api/calc/faultlevels", post(fault_levels))
            .route("/api/calc/grading", post(grading))
            .route("/api/calc/tcc", post(tcc))
    }

    async fn fault_levels(
        Json(payload): Json<FaultLevelsRequest>,
    ) -> Result<Json<FaultLevels>, StatusCode> {
        FaultLevels::for_transformer(&payload.transformer)
            .map(Json)
            .map_err(map_err)
    }

    async fn grading(
        Json(payload): Json<GradingStudy>,
    ) -> Result<Json<GradingReport>, StatusCode> {
        run_grading(&payload).map(Json).map_err(map_err)
    }

    async fn tcc(Json(payload): Json<TccStudy>) -> Result<Json<TccReport>, StatusCode> {
        run_tcc(&payload).map(Json).map_err(map_err)
    }

    fn map_err(err: CalcEngineError) -> StatusCode {
        if err.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FaultLevelsRequest {
    pub transformer: TransformerRating,
}
