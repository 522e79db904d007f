//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// REST API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] rejecting the malformed request `field`.
    #[must_use]
    pub fn invalid(field: &str) -> Self {
        Self {
            code: "INVALID_INPUT",
            status_code: http::StatusCode::BAD_REQUEST,
            message: format!("Invalid `{field}` value"),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

/// JSON body of an [`Error`] response.
#[derive(Debug, Serialize)]
struct Body<'e> {
    /// [`Error::code`].
    code: Code,

    /// [`Error::message`].
    message: &'e str,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            log::error!("{self}");
        }
        let body = Body {
            code: self.code,
            message: &self.message,
        };
        (self.status_code, Json(body)).into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

/// Implements [`AsError`] for the provided request rejections, turning them
/// into `BAD_REQUEST` [`Error`]s.
macro_rules! impl_bad_request {
    ($($rejection:ty),* $(,)?) => {$(
        impl AsError for $rejection {
            fn try_as_error(&self) -> Option<Error> {
                Some(Error {
                    code: "BAD_REQUEST",
                    status_code: http::StatusCode::BAD_REQUEST,
                    message: self.body_text(),
                    backtrace: None,
                })
            }
        }

        impl From<$rejection> for Error {
            fn from(rejection: $rejection) -> Self {
                rejection.into_error()
            }
        }
    )*};
}

impl_bad_request!(JsonRejection, PathRejection, QueryRejection);

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: "BAD_REQUEST",
            status_code: http::StatusCode::BAD_REQUEST,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use std::fmt;

    use axum::response::IntoResponse as _;

    use crate::define_error;

    use super::{AsError, Error};

    define_error! {
        enum TestError {
            #[code = "BOOK_AVAILABLE"]
            #[status = UNPROCESSABLE_ENTITY]
            #[message = "`Book` has free copies"]
            BookAvailable,
        }
    }

    #[test]
    fn defines_errors() {
        let err = Error::from(TestError::BookAvailable);

        assert_eq!(err.code, "BOOK_AVAILABLE");
        assert_eq!(err.status_code, http::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.to_string(),
            "[BOOK_AVAILABLE]: `Book` has free copies",
        );
    }

    #[test]
    fn renders_status_code() {
        let res = Error::from(TestError::BookAvailable).into_response();
        assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);

        let res = Error::internal(&"boom").into_response();
        assert_eq!(res.status(), http::StatusCode::INTERNAL_SERVER_ERROR);

        let res = Error::invalid("isbn").into_response();
        assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn falls_back_to_internal() {
        struct Unknown;

        impl fmt::Display for Unknown {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "unknown failure")
            }
        }

        impl AsError for Unknown {
            fn try_as_error(&self) -> Option<Error> {
                None
            }
        }

        let err = Unknown.into_error();
        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(err.message, "unknown failure");
    }
}
