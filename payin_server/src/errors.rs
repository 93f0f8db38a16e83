use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use payin_engine::{AllocationError, InvoiceFlowError, MerchantGateError};
use thiserror::Error;

use crate::data_objects::CreateInvoiceResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("parse request body: {0}")]
    CouldNotDeserializePayload(String),
    #[error("{0}")]
    InvalidRequestBody(String),
    #[error("{0}")]
    InvoiceFlowError(#[from] InvoiceFlowError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ServerError {
    /// The message placed in the response envelope. Invoice flow errors are reduced to their public form.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvoiceFlowError(e) => e.public_message(),
            Self::CouldNotDeserializePayload(_) | Self::InvalidRequestBody(_) => self.to_string(),
            _ => "internal server error".to_string(),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvoiceFlowError(e) => match e {
                InvoiceFlowError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                InvoiceFlowError::GateError(e) => match e {
                    MerchantGateError::UnknownChannelType(_) => StatusCode::BAD_REQUEST,
                    MerchantGateError::MerchantNotFound(_) => StatusCode::NOT_FOUND,
                    MerchantGateError::AmountBelowMerchantMinimum { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    MerchantGateError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
                InvoiceFlowError::AllocationError(e) => match e {
                    AllocationError::NoAvailableChannels { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    AllocationError::InvalidConstraintInput(_) => StatusCode::BAD_REQUEST,
                    AllocationError::RepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
                InvoiceFlowError::AllocationTimedOut(_) => StatusCode::SERVICE_UNAVAILABLE,
                InvoiceFlowError::AssemblyError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ Request failed. {self}");
        }
        let body = CreateInvoiceResponse::failure(self.public_message());
        HttpResponse::build(status).insert_header(ContentType::json()).json(body)
    }
}
