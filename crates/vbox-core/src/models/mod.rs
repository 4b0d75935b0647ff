// Wire types for the marketplace backend.

pub mod auth;
pub mod market;
pub mod order;
pub mod payment_term;
pub mod profile;
pub mod quotation;

pub use auth::{AuthUser, RegisterResponse, VerifyOtpResponse};
pub use market::{FpoOffer, MarketChip};
pub use order::{
    Order, OrderCreateRequest, OrderDetail, OrderList, OrderPayment, OrderPaymentCreate,
    OrderRole, OrderStatusHistory,
};
pub use payment_term::PaymentTerm;
pub use profile::{
    Address, AddressDraft, AddressType, AddressUpdate, BusinessProfile, FullProfile, Gender,
    KycDetails, PersonalProfile,
};
pub use quotation::{Quotation, QuotationList, QuotationRequest, QuotationStatus};
