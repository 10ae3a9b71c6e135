fn main() {
    knockout_cup_lib::run()
}
