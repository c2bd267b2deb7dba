fn main() {
    kindle_downloader_lib::run()
}
