fn main() {
    kangkang_lib::run()
}
