pub mod membershipdtos;
pub mod userdtos;
