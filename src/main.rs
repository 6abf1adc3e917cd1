fn main() -> std::process::ExitCode {
    codeblue_lib::run()
}
