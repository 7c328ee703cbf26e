mod admin;
mod customer;
mod donation;
mod live;
mod technician;
