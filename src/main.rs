fn main() {
    depth_pipeline::cli::run();
}
