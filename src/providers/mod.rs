pub mod firebase_auth;
pub mod util;
pub mod yahoo_finance;
