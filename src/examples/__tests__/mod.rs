mod arithmetic_test;
mod json_test;
