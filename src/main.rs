fn main() {
    okrlens_lib::run()
}
