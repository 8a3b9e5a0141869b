//! Region Extract Server Library
//!
//! Extracts a region of a page from a document in S3, either as the OCR text
//! inside it or as a cropped image. The server binary is in main.rs; the
//! modules are exposed here for integration tests.
//!
//! # Modules
//!
//! - `geometry`: normalized rectangles, containment and pixel crops
//! - `ocr`: stored OCR results, Textract jobs and the polling loop
//! - `render`: page rasterization via MuPDF
//! - `extract`: text and image extractors and the dispatcher
//! - `routes`: HTTP endpoints

pub mod config;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod ocr;
pub mod render;
pub mod routes;
pub mod state;
pub mod storage;
