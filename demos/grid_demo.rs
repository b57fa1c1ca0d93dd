use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    gridquery::demo_apps::run_grid_demo(std::env::args().skip(1))
}
