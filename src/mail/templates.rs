pub struct VerificationEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl VerificationEmail {
    pub fn new(link: &str) -> Self {
        Self {
            subject: "Verify your email".to_string(),
            text: format!(
                "Welcome to Contactbook!\n\n\
                 Please verify your email by opening the following link:\n{link}\n\n\
                 If you did not create an account, you can ignore this message."
            ),
            html: format!(
                r#"<!DOCTYPE html>
<html>
<body style="font-family: sans-serif; line-height: 1.5; color: #222;">
    <h1>Welcome to Contactbook!</h1>
    <p>Please verify your email by clicking on the following link:</p>
    <p><a href="{link}">{link}</a></p>
    <p style="color: #777; font-size: 12px;">If you did not create an account, you can ignore this message.</p>
</body>
</html>"#
            ),
        }
    }
}
