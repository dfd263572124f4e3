pub mod order_csv;
