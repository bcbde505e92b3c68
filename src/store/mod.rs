pub mod bookings;
pub mod otp;
pub mod pricing;
pub mod users;
