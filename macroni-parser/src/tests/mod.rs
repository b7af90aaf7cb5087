mod test_expressions;
