pub(crate) mod binary_choice;
pub(crate) mod branch_table;
pub(crate) mod loading;
pub(crate) mod modal;
pub(crate) mod text;
