//! Client-side validation failures.
//!
//! These are raised before any network call is made and are meant to be
//! shown inline next to the control that caused them.

use thiserror::Error;

use super::status::OrderStatus;

/// A client-side validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("quantity must be at least 1")]
    QuantityTooLow,

    #[error("quantity would drop to {resulting}; remove the item instead")]
    QuantityWouldDropBelowOne { resulting: i64 },

    #[error("price cannot be negative")]
    NegativePrice,

    #[error("item is not in the cart")]
    LineNotInCart,

    #[error("please choose a cancellation reason")]
    MissingCancelReason,

    #[error("please describe why you want to cancel")]
    EmptyDescription,

    #[error("description must be at most {max} characters (got {actual})")]
    DescriptionTooLong { max: usize, actual: usize },

    #[error("orders that are {0} cannot be cancelled")]
    NotCancellable(OrderStatus),

    #[error("a cancellation request already exists for this order")]
    CancellationAlreadyRequested,

    #[error("cancellation form does not match an order that is {0}")]
    WrongCancellationForm(OrderStatus),

    #[error("page {page} is out of range (1..={pages})")]
    PageOutOfRange { page: u32, pages: u32 },

    #[error("coupon rejected: {0}")]
    Coupon(String),

    #[error("cannot move an order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },
}
