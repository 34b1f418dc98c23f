//! Checkout handler.

mod process_checkout;

pub use process_checkout::{
    CheckoutOptions, ProcessCheckoutCommand, ProcessCheckoutHandler, ProcessCheckoutResult,
};
