pub mod graphql;
pub mod http;
pub mod intercept;
pub mod page;
pub mod view;
