fn main() {
    nebula_launch::cli::run();
}
