pub(crate) mod csv_parser;
pub(crate) mod normalizer;
pub(crate) mod sales_model;
pub(crate) mod sales_repository;
pub(crate) mod sales_service;

pub use csv_parser::{parse_sales_csv, ParsedSalesCsv, SalesCsvRow};
pub use normalizer::normalize_demands;
pub use sales_model::{
    Demand, NewSalesRow, SalesImportReport, SalesRaw, SalesRawDB, UnmappedSku,
};
pub use sales_repository::SalesRepository;
pub use sales_service::SalesService;
