fn main() {
    pricefactor::cli::run();
}
