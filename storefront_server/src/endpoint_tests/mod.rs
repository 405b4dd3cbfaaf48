mod helpers;
mod orders;
