pub mod meta {
    tonic::include_proto!("clade.meta");

    impl Status {
        pub fn ok() -> Self {
            Self {
                code: status::Code::Ok as i32,
                message: String::new(),
            }
        }

        pub fn error(code: status::Code, message: impl Into<String>) -> Self {
            Self {
                code: code as i32,
                message: message.into(),
            }
        }

        pub fn is_ok(&self) -> bool {
            self.code == status::Code::Ok as i32
        }
    }
}
