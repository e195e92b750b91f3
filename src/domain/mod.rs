pub mod account;

pub use account::{
    AadharNumber, Account, ContactNumber, Field, NewAccount, Role, SealedAadhar, SignupForm,
    ValidationError, ValidationErrors,
};
