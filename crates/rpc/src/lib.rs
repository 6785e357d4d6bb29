//! HTTP gateway for the advisor service
//!
//! Routes:
//! - `GET /` status
//! - `POST /train?test_size=`
//! - `POST /predict`
//! - `POST /recommendations?risk=`
//! - `POST /chat`
//!
//! Errors are returned as `{"error": "<message>"}`.

pub mod server;

pub use server::{
    build_router, start_server, AppState, ChatResponse, PredictResponse, RecommendationsResponse,
    SharedState, StatusResponse, TrainResponse, STATUS_NOTE,
};
