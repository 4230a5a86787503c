pub mod dao;

pub use dao::BaseDao;
