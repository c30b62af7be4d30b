pub mod einvoice;
